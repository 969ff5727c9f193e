//! Metrics reported by subnets and merged for the operator.
//!
//! - [`MetricsSnapshot`], [`PartialMetrics`] the data model
//! - [`MetricsAggregator`] per-subnet state, merged total, change detection
//! - [`JobsReporter`] side channel for incremental job counts

mod aggregator;
mod snapshot;

pub use aggregator::{JobsReporter, MetricsAggregator, TracingJobsReporter};
pub use snapshot::{MetricsSnapshot, PartialMetrics};
