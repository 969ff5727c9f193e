//! # RefreshScheduler: background source refresh within a generation.
//!
//! ```text
//! loop {
//!   sleep(interval ± jitter)        (cancellable → return NotNeeded)
//!   refresh_all(Background)
//!     ├─ Ok(true)      ─► info "Updated subnet source code, restarting..." → return Restart
//!     ├─ Ok(false)     ─► loop
//!     ├─ Err(Canceled) ─► return NotNeeded
//!     └─ Err(e)        ─► error "Failed to update subnet source code" → loop
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::activity::ActivityHub;
use crate::error::FetchError;
use crate::policies::JitterPolicy;
use crate::source::{RefreshScope, RetryingFetcher};

/// Why the scheduler stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A subnet's source changed; the generation should restart.
    Restart,
    /// The generation ended first.
    Canceled,
}

/// Periodically refreshes subnet sources while a generation runs.
pub struct RefreshScheduler {
    fetcher: Arc<RetryingFetcher>,
    activity: Arc<ActivityHub>,
    interval: Duration,
    jitter: JitterPolicy,
    experimental: bool,
}

impl RefreshScheduler {
    pub fn new(
        fetcher: Arc<RetryingFetcher>,
        activity: Arc<ActivityHub>,
        interval: Duration,
        jitter: JitterPolicy,
        experimental: bool,
    ) -> Self {
        Self {
            fetcher,
            activity,
            interval,
            jitter,
            experimental,
        }
    }

    /// Runs until a refresh changes a source or `token` is cancelled.
    pub async fn run(&self, token: &CancellationToken) -> RefreshOutcome {
        let scope = RefreshScope::Background {
            experimental: self.experimental,
        };
        loop {
            let delay = self.jitter.apply(self.interval);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => return RefreshOutcome::Canceled,
            }

            match self.fetcher.refresh_all(scope, Some(token)).await {
                Ok(true) => {
                    self.activity
                        .station_info("Updated subnet source code, restarting...");
                    return RefreshOutcome::Restart;
                }
                Ok(false) => tracing::debug!("subnet sources unchanged"),
                Err(FetchError::Canceled) => return RefreshOutcome::Canceled,
                Err(e) => {
                    tracing::error!(error = %e, label = e.as_label(), "background source refresh failed");
                    self.activity
                        .station_error("Failed to update subnet source code");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ActivityEvent, ActivityKind};
    use crate::policies::RetryPolicy;
    use crate::source::{MemoryResolver, SourceSync};
    use crate::subnets::{SubnetDescriptor, SubnetFilter};
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct Fixture {
        resolver: Arc<MemoryResolver>,
        scheduler: RefreshScheduler,
        notices: Arc<Mutex<Vec<(ActivityKind, String)>>>,
        _dir: tempfile::TempDir,
    }

    async fn fixture(retry: RetryPolicy) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Arc::new(MemoryResolver::new());
        resolver.publish("k51-spark", "v1", &[("main.js", "one")]);
        let sync = Arc::new(SourceSync::new(resolver.clone(), dir.path()));
        let fetcher = Arc::new(RetryingFetcher::new(
            sync,
            retry,
            vec![SubnetDescriptor::new("spark", "k51-spark")],
            SubnetFilter::All,
        ));
        fetcher
            .refresh_all(RefreshScope::Startup, None)
            .await
            .unwrap();

        let hub = Arc::new(ActivityHub::new());
        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = notices.clone();
        hub.subscribe_fn("rec", move |ev: &ActivityEvent| {
            sink.lock().unwrap().push((ev.kind, ev.message.clone()));
        });

        Fixture {
            resolver,
            scheduler: RefreshScheduler::new(
                fetcher,
                hub,
                Duration::from_secs(600),
                JitterPolicy::Spread(Duration::from_secs(10)),
                false,
            ),
            notices,
            _dir: dir,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restarts_when_a_source_changes() {
        let f = fixture(RetryPolicy::default()).await;
        let resolver = f.resolver.clone();
        tokio::spawn(async move {
            // after the first pass (590..=610 s), before the second
            tokio::time::sleep(Duration::from_secs(900)).await;
            resolver.publish("k51-spark", "v2", &[("main.js", "two")]);
        });

        let start = Instant::now();
        let token = CancellationToken::new();
        assert_eq!(f.scheduler.run(&token).await, RefreshOutcome::Restart);

        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(1180), "{waited:?}");
        assert!(waited <= Duration::from_secs(1220), "{waited:?}");
        assert_eq!(
            *f.notices.lock().unwrap(),
            vec![(
                ActivityKind::Info,
                "Updated subnet source code, restarting...".to_string()
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let f = fixture(RetryPolicy::default()).await;
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            cancel.cancel();
        });

        let start = Instant::now();
        assert_eq!(f.scheduler.run(&token).await, RefreshOutcome::Canceled);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert!(f.notices.lock().unwrap().is_empty());
        assert_eq!(f.resolver.resolve_calls("k51-spark").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_is_reported_and_the_loop_goes_on() {
        let retry = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let f = fixture(retry).await;
        f.resolver.fail_next("k51-spark", "connection reset");

        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1500)).await;
            cancel.cancel();
        });

        assert_eq!(f.scheduler.run(&token).await, RefreshOutcome::Canceled);
        assert_eq!(
            *f.notices.lock().unwrap(),
            vec![(
                ActivityKind::Error,
                "Failed to update subnet source code".to_string()
            )]
        );
        // startup + two background passes
        assert_eq!(f.resolver.resolve_calls("k51-spark").len(), 3);
    }
}
