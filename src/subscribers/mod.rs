//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the ordered [`SubscriberSet`]
//! used by both hubs, and built-in subscribers.
//!
//! ## Architecture
//! ```text
//! ActivityHub::submit(ev) ─┐
//!                          ├──► SubscriberSet::emit(&ev)
//! MetricsAggregator ───────┘         │
//!   (merged changed)                 ├──► LogWriter            (tracing)
//!                                    ├──► BusForwarder         (AgentEvent stream)
//!                                    ├──► ActivitySinkWriter   (activity log file)
//!                                    ├──► MetricsSinkWriter    (metrics log file)
//!                                    └──► FnSubscriber / custom
//! ```

mod bridge;
mod log;
mod set;
mod sink;
mod subscribe;

pub use bridge::BusForwarder;
pub use log::{LogWriter, ACTIVITY_TARGET, JOBS_TARGET, METRICS_TARGET};
pub use set::SubscriberSet;
pub use sink::{format_activity, ActivitySinkWriter, FileSink, LineSink, MetricsSinkWriter};
pub use subscribe::{FnSubscriber, Subscribe};
