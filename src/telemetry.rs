//! # Tracing setup for programs embedding the agent.
//!
//! Requires the `logging` feature. Besides its module paths, the agent logs
//! under three dedicated targets:
//! - [`ACTIVITY_TARGET`]: every activity notice, via [`LogWriter`](crate::LogWriter);
//! - [`METRICS_TARGET`]: merged metrics updates;
//! - [`JOBS_TARGET`]: per-subnet job deltas from [`TracingJobsReporter`](crate::TracingJobsReporter).
//!
//! Job deltas are one line per subnet per submission, so they are off unless
//! [`TracingOptions::job_deltas`] is set or `RUST_LOG` names the target.
//!
//! ## Example
//! ```rust,no_run
//! use subnetvisor::telemetry::{init_tracing, TracingOptions};
//!
//! init_tracing(&TracingOptions {
//!     json: true,
//!     ..TracingOptions::default()
//! });
//! ```

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub use crate::subscribers::{ACTIVITY_TARGET, JOBS_TARGET, METRICS_TARGET};

/// How the global subscriber is set up.
#[derive(Clone, Copy, Debug)]
pub struct TracingOptions {
    /// One JSON object per line instead of human-readable text.
    pub json: bool,
    /// Verbosity when `RUST_LOG` is not set.
    pub level: Level,
    /// Keep [`JOBS_TARGET`] events when `RUST_LOG` is not set.
    pub job_deltas: bool,
}

impl Default for TracingOptions {
    /// `INFO`, plain text, job deltas off.
    fn default() -> Self {
        Self {
            json: false,
            level: Level::INFO,
            job_deltas: false,
        }
    }
}

/// Builds the filter for `opts`.
///
/// Non-empty `directives` (the `RUST_LOG` value) win over `opts` entirely.
pub fn filter(opts: &TracingOptions, directives: Option<&str>) -> EnvFilter {
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None if opts.job_deltas => EnvFilter::new(opts.level.as_str()),
        None => EnvFilter::new(format!("{},{JOBS_TARGET}=off", opts.level.as_str())),
    }
}

/// Installs the global subscriber. Only the first call in a process takes
/// effect.
pub fn init_tracing(opts: &TracingOptions) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = filter(opts, rust_log.as_deref());

    let installed = if opts.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    };
    if installed.is_ok() {
        tracing::debug!(json = opts.json, level = %opts.level, job_deltas = opts.job_deltas, "tracing initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{Context, Layer};

    /// Records the target of every event that passes the filter.
    #[derive(Clone, Default)]
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for Targets {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(event.metadata().target().to_string());
        }
    }

    fn seen_with(filter: EnvFilter, emit: impl FnOnce()) -> Vec<String> {
        let targets = Targets::default();
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(targets.clone());
        tracing::subscriber::with_default(subscriber, emit);
        let seen = targets.0.lock().unwrap().clone();
        seen
    }

    #[test]
    fn job_deltas_are_off_by_default() {
        let seen = seen_with(filter(&TracingOptions::default(), None), || {
            tracing::info!(target: JOBS_TARGET, value = 3u64, "delta");
            tracing::info!(target: ACTIVITY_TARGET, "Spark started");
            tracing::debug!(target: METRICS_TARGET, "too verbose");
        });
        assert_eq!(seen, vec![ACTIVITY_TARGET.to_string()]);
    }

    #[test]
    fn job_deltas_can_be_enabled() {
        let opts = TracingOptions {
            job_deltas: true,
            ..TracingOptions::default()
        };
        let seen = seen_with(filter(&opts, None), || {
            tracing::info!(target: JOBS_TARGET, value = 4u64, "delta");
        });
        assert_eq!(seen, vec![JOBS_TARGET.to_string()]);
    }

    #[test]
    fn rust_log_directives_replace_the_options() {
        let seen = seen_with(filter(&TracingOptions::default(), Some("telemetry=info")), || {
            tracing::info!(target: JOBS_TARGET, value = 5u64, "delta");
            tracing::info!(target: ACTIVITY_TARGET, "Spark exited");
        });
        assert_eq!(seen, vec![JOBS_TARGET.to_string()]);

        let blank = seen_with(filter(&TracingOptions::default(), Some("  ")), || {
            tracing::info!(target: ACTIVITY_TARGET, "Spark crashed");
        });
        assert_eq!(blank, vec![ACTIVITY_TARGET.to_string()]);
    }

    #[test]
    fn second_init_is_ignored() {
        init_tracing(&TracingOptions::default());
        init_tracing(&TracingOptions {
            json: true,
            level: Level::DEBUG,
            job_deltas: true,
        });
        tracing::info!("still logging");
    }
}
