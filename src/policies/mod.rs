//! Timing policies.
//!
//! This module groups the knobs that decide **how long** the agent waits:
//! between failed fetch attempts, after rate-limiting responses, and between
//! background source refreshes.
//!
//! ## Contents
//! - [`BackoffPolicy`] exponential delay between ordinary fetch retries
//! - [`JitterPolicy`] randomization to keep agents out of lock-step
//! - [`RetryPolicy`] bounded attempts plus the rate-limit window
//!
//! ## Quick wiring
//! ```text
//! Config { retry: RetryPolicy, refresh_interval, refresh_jitter }
//!      ├─► source::RetryingFetcher uses retry.delay_after(err, attempt)
//!      └─► core::RefreshScheduler uses JitterPolicy::Spread(refresh_jitter)
//! ```

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::{RateLimitBackoff, RetryDelay, RetryPolicy};
