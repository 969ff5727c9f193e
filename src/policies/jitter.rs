//! # Jitter policy for timed waits.
//!
//! Every node agent in the network runs the same timers. Without jitter they
//! poll the shared resolution service in lock-step.
//!
//! - [`JitterPolicy::None`]: exact delay
//! - [`JitterPolicy::Full`]: uniform in `[0, delay]`
//! - [`JitterPolicy::Equal`]: `delay/2 + uniform[0, delay/2]`
//! - [`JitterPolicy::Spread`]: `delay ± uniform[0, spread]`

use rand::Rng;
use std::time::Duration;

/// Randomization applied to a base delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact delay.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2 + uniform[0, delay/2]`.
    Equal,
    /// `delay` shifted by a uniform offset in `[-spread, +spread]`, floored at zero.
    Spread(Duration),
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match *self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => uniform(Duration::ZERO, delay),
            JitterPolicy::Equal => {
                let half = delay / 2;
                half + uniform(Duration::ZERO, delay - half)
            }
            JitterPolicy::Spread(spread) => {
                let low = delay.saturating_sub(spread);
                uniform(low, delay.saturating_add(spread))
            }
        }
    }
}

/// Uniformly distributed duration in `[low, high]` (millisecond resolution).
pub fn uniform(low: Duration, high: Duration) -> Duration {
    let lo = low.as_millis() as u64;
    let hi = high.as_millis() as u64;
    if hi <= lo {
        return low;
    }
    Duration::from_millis(rand::rng().random_range(lo..=hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_stays_within_window() {
        let base = Duration::from_secs(600);
        let policy = JitterPolicy::Spread(Duration::from_secs(10));
        for _ in 0..200 {
            let d = policy.apply(base);
            assert!(d >= Duration::from_secs(590), "{d:?} too short");
            assert!(d <= Duration::from_secs(610), "{d:?} too long");
        }
    }

    #[test]
    fn spread_never_goes_negative() {
        let policy = JitterPolicy::Spread(Duration::from_secs(10));
        for _ in 0..50 {
            assert!(policy.apply(Duration::from_secs(1)) <= Duration::from_secs(11));
        }
    }

    #[test]
    fn equal_keeps_at_least_half() {
        for _ in 0..100 {
            let d = JitterPolicy::Equal.apply(Duration::from_millis(1000));
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn zero_delay_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::None.apply(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn uniform_degenerate_range() {
        let d = Duration::from_secs(3);
        assert_eq!(uniform(d, d), d);
        assert_eq!(uniform(d, Duration::from_secs(1)), d);
    }
}
