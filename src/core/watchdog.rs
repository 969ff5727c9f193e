//! # Inactivity watchdog.
//!
//! One [`Watchdog`] per child process. Every output line calls [`Watchdog::kick`];
//! [`Watchdog::expired`] completes once `timeout` passes without a kick.
//!
//! ```text
//! loop {
//!   select! {
//!     sleep(timeout) ─► return          (fired)
//!     notified()     ─► continue        (re-armed)
//!   }
//! }
//! ```
//!
//! The timer lives inside the `expired` future: dropping it (generation end)
//! clears the watchdog.

use std::time::Duration;

use tokio::sync::Notify;

/// Resettable inactivity timer.
pub struct Watchdog {
    timeout: Duration,
    kicks: Notify,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            kicks: Notify::new(),
        }
    }

    /// Re-arms the timer. A kick while nobody awaits `expired` is remembered.
    #[inline]
    pub fn kick(&self) {
        self.kicks.notify_one();
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Completes when `timeout` elapses with no kick.
    pub async fn expired(&self) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.timeout) => return,
                _ = self.kicks.notified() => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn fires_after_silence() {
        let dog = Watchdog::new(Duration::from_secs(300));
        let start = Instant::now();
        dog.expired().await;
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn kicks_postpone_expiry() {
        let dog = Arc::new(Watchdog::new(Duration::from_secs(300)));
        let kicker = dog.clone();
        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_secs(200)).await;
                kicker.kick();
            }
        });

        let start = Instant::now();
        dog.expired().await;
        // last kick at 600s, then 300s of silence
        assert_eq!(start.elapsed(), Duration::from_secs(900));
    }
}
