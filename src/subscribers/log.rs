//! # LogWriter: activity and metrics through `tracing`
//!
//! Subscribes to both hubs and mirrors what it sees into the log.
//!
//! ## Example output
//! ```text
//! INFO  activity source="spark" Spark started
//! ERROR activity source="spark" Spark crashed with exit code 1
//! INFO  metrics updated total_jobs_completed=42 rewards_scheduled_for_address=0
//! ```

use crate::events::{ActivityEvent, ActivityKind};
use crate::metrics::MetricsSnapshot;
use crate::subscribers::Subscribe;

/// `tracing` target of activity notices.
pub const ACTIVITY_TARGET: &str = "activity";
/// `tracing` target of merged metrics updates.
pub const METRICS_TARGET: &str = "metrics";
/// `tracing` target of per-subnet job deltas.
pub const JOBS_TARGET: &str = "telemetry";

/// Log-forwarding subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe<ActivityEvent> for LogWriter {
    fn on_event(&self, e: &ActivityEvent) {
        match e.kind {
            ActivityKind::Info => {
                tracing::info!(target: ACTIVITY_TARGET, source = %e.source, "{}", e.message)
            }
            ActivityKind::Error => {
                tracing::error!(target: ACTIVITY_TARGET, source = %e.source, "{}", e.message)
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

impl Subscribe<MetricsSnapshot> for LogWriter {
    fn on_event(&self, m: &MetricsSnapshot) {
        tracing::info!(
            target: METRICS_TARGET,
            total_jobs_completed = m.total_jobs_completed,
            rewards_scheduled_for_address = %m.rewards_scheduled_for_address,
            "updated"
        );
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
