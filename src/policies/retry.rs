//! # Retry policy for source fetches.
//!
//! [`RetryPolicy`] bounds the number of attempts and picks the wait before the
//! next one. Ordinary failures use the exponential [`BackoffPolicy`]; failures
//! whose text says the resolution service is rate-limiting us wait a random
//! 60–120 seconds instead so that throttled agents do not retry in a storm.
//!
//! ```text
//! attempt fails ──► err.is_rate_limited()?
//!                     ├─ yes ─► RetryDelay::RateLimited(uniform[60s, 120s])
//!                     └─ no  ─► RetryDelay::Backoff(backoff.delay(attempt - 1))
//! ```

use std::time::Duration;

use crate::error::FetchError;
use crate::policies::backoff::BackoffPolicy;
use crate::policies::jitter;

/// Window for the randomized wait after a rate-limiting response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitBackoff {
    /// Shortest wait.
    pub min: Duration,
    /// Longest wait.
    pub max: Duration,
}

impl Default for RateLimitBackoff {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(60),
            max: Duration::from_secs(120),
        }
    }
}

impl RateLimitBackoff {
    /// Picks a uniformly distributed wait inside the window.
    pub fn pick(&self) -> Duration {
        jitter::uniform(self.min, self.max)
    }
}

/// Wait chosen after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDelay {
    /// Ordinary exponential backoff.
    Backoff(Duration),
    /// The service told us to slow down.
    RateLimited(Duration),
}

impl RetryDelay {
    /// The duration to sleep.
    #[inline]
    pub fn duration(&self) -> Duration {
        match *self {
            RetryDelay::Backoff(d) | RetryDelay::RateLimited(d) => d,
        }
    }
}

/// Bounded retry with rate-limit awareness.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay growth for ordinary failures.
    pub backoff: BackoffPolicy,
    /// Delay window for rate-limited failures.
    pub rate_limit: RateLimitBackoff,
}

impl Default for RetryPolicy {
    /// 10 attempts, default [`BackoffPolicy`], 60–120 s on rate limiting.
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffPolicy::default(),
            rate_limit: RateLimitBackoff::default(),
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_after(&self, err: &FetchError, attempt: u32) -> RetryDelay {
        if err.is_rate_limited() {
            RetryDelay::RateLimited(self.rate_limit.pick())
        } else {
            RetryDelay::Backoff(self.backoff.delay(attempt.saturating_sub(1)))
        }
    }

    /// Whether another attempt is allowed after `attempt` failures.
    #[inline]
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RATE_LIMIT_MARKER;

    fn throttled() -> FetchError {
        FetchError::Resolve {
            name: "k51".into(),
            error: format!("{RATE_LIMIT_MARKER}, try again later"),
        }
    }

    fn broken() -> FetchError {
        FetchError::Download {
            path: "main.js".into(),
            error: "connection reset by peer".into(),
        }
    }

    #[test]
    fn rate_limited_waits_one_to_two_minutes() {
        let policy = RetryPolicy::default();
        for attempt in 1..=10 {
            match policy.delay_after(&throttled(), attempt) {
                RetryDelay::RateLimited(d) => {
                    assert!(d >= Duration::from_secs(60), "{d:?}");
                    assert!(d <= Duration::from_secs(120), "{d:?}");
                }
                other => panic!("expected rate-limited delay, got {other:?}"),
            }
        }
    }

    #[test]
    fn ordinary_failures_use_shorter_backoff() {
        let policy = RetryPolicy::default();
        for attempt in 1..=10 {
            match policy.delay_after(&broken(), attempt) {
                RetryDelay::Backoff(d) => assert!(d <= Duration::from_secs(30), "{d:?}"),
                other => panic!("expected backoff delay, got {other:?}"),
            }
        }
        assert_eq!(
            policy.delay_after(&broken(), 1).duration(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn attempts_are_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(9));
        assert!(!policy.allows_retry(10));

        let single = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(!single.allows_retry(1));
    }
}
