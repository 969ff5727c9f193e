//! # MetricsAggregator: per-subnet snapshots and the merged total.
//!
//! ## Submission flow
//! ```text
//! submit(subnet, partial)
//!   ├─► resolved = previous(subnet) or zero, overlaid with partial
//!   ├─► if partial has a jobs counter and subnet had a snapshot:
//!   │       diff = new - old; diff > 0 ─► JobsReporter::report(subnet, diff)
//!   ├─► per_subnet[subnet] = resolved
//!   ├─► merged = Σ per_subnet
//!   └─► merged != last merged (or first merge) ─► subscribers.emit(&merged)
//! ```
//!
//! ## Rules
//! - Counter drops (subnet restarted, counter reset to 0) are never reported
//!   as negative work. The lower value becomes the new baseline.
//! - Re-submitting identical values produces no notification.
//! - Notifications are delivered in the order the merged values were
//!   computed; the last one a subscriber sees equals [`MetricsAggregator::merged`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::metrics::{MetricsSnapshot, PartialMetrics};
use crate::subscribers::{Subscribe, SubscriberSet, JOBS_TARGET};

/// Side channel for incremental "jobs completed" measurements.
pub trait JobsReporter: Send + Sync + 'static {
    /// `delta` jobs were completed by `subnet` since its previous submission.
    fn report(&self, subnet: &str, delta: u64);
}

/// Logs each measurement as a `jobs-completed` point tagged with the subnet.
#[derive(Default)]
pub struct TracingJobsReporter;

impl JobsReporter for TracingJobsReporter {
    fn report(&self, subnet: &str, delta: u64) {
        tracing::info!(target: JOBS_TARGET, measurement = "jobs-completed", subnet, value = delta);
    }
}

#[derive(Default)]
struct State {
    per_subnet: HashMap<String, MetricsSnapshot>,
    merged: Option<MetricsSnapshot>,
}

/// Holds the latest snapshot per subnet and notifies on merged changes.
pub struct MetricsAggregator {
    state: Mutex<State>,
    emit: Mutex<()>,
    subs: SubscriberSet<MetricsSnapshot>,
    reporter: Arc<dyn JobsReporter>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(Arc::new(TracingJobsReporter))
    }
}

impl MetricsAggregator {
    /// Creates an aggregator reporting job deltas to `reporter`.
    pub fn new(reporter: Arc<dyn JobsReporter>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            emit: Mutex::new(()),
            subs: SubscriberSet::default(),
            reporter,
        }
    }

    /// Registers a subscriber for merged updates.
    pub fn subscribe(&self, sub: Arc<dyn Subscribe<MetricsSnapshot>>) {
        self.subs.add(sub);
    }

    /// Records a submission from `subnet`.
    ///
    /// Returns the new merged snapshot when it changed (subscribers have
    /// already been notified), `None` otherwise.
    ///
    /// Concurrent submissions are serialized through delivery, so a
    /// subscriber must not call `submit` itself.
    pub fn submit(&self, subnet: &str, partial: PartialMetrics) -> Option<MetricsSnapshot> {
        // Taken before the state lock and held through delivery, so two
        // submissions can never notify in the opposite order they merged.
        let _emit = self.emit.lock().unwrap_or_else(|p| p.into_inner());
        let (delta, changed) = {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            let previous = state.per_subnet.get(subnet).copied();

            let delta = match (partial.total_jobs_completed, previous) {
                (Some(new), Some(old)) => new.checked_sub(old.total_jobs_completed).filter(|d| *d > 0),
                _ => None,
            };

            let resolved = previous.unwrap_or_default().overlay(partial);
            state.per_subnet.insert(subnet.to_string(), resolved);

            let merged = state
                .per_subnet
                .values()
                .fold(MetricsSnapshot::default(), |acc, m| acc.add(*m));

            let changed = if state.merged != Some(merged) {
                state.merged = Some(merged);
                Some(merged)
            } else {
                None
            };
            (delta, changed)
        };

        if let Some(delta) = delta {
            self.reporter.report(subnet, delta);
        }
        if let Some(merged) = &changed {
            self.subs.emit(merged);
        }
        changed
    }

    /// Last merged snapshot, if anything was submitted.
    pub fn merged(&self) -> Option<MetricsSnapshot> {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).merged
    }

    /// Latest snapshot of one subnet.
    pub fn snapshot(&self, subnet: &str) -> Option<MetricsSnapshot> {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .per_subnet
            .get(subnet)
            .copied()
    }
}
