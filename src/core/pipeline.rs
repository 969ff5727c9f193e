//! # EventPipeline: subnet stdout → activity and metrics.
//!
//! ```text
//! chunk ──► split lines ──► skip blank ──► parse_line
//!                                             ├─ Err            ─► warn, next line
//!                                             ├─ Started        ─► ActivityHub  "<Subnet> started"
//!                                             ├─ Info / Error   ─► ActivityHub  (generic runtime name replaced)
//!                                             ├─ JobsCompleted  ─► MetricsAggregator::submit(subnet, jobs)
//!                                             └─ Unknown        ─► debug, next line
//! ```
//!
//! A line is handled completely before the next one; a failed parse skips the
//! rest of that line's handling.

use std::sync::Arc;

use crate::activity::ActivityHub;
use crate::events::{parse_line, LineError, SubnetEvent};
use crate::metrics::{MetricsAggregator, PartialMetrics};
use crate::subnets::SubnetDescriptor;

/// Name subnets use for themselves in generic runtime messages.
const GENERIC_RUNTIME_NAME: &str = "Module Runtime";

/// Dispatches one subnet's output events.
pub struct EventPipeline {
    subnet: Arc<str>,
    display: String,
    activity: Arc<ActivityHub>,
    metrics: Arc<MetricsAggregator>,
}

impl EventPipeline {
    pub fn new(
        subnet: &SubnetDescriptor,
        activity: Arc<ActivityHub>,
        metrics: Arc<MetricsAggregator>,
    ) -> Self {
        Self {
            subnet: Arc::from(subnet.name.as_ref()),
            display: subnet.display_name(),
            activity,
            metrics,
        }
    }

    /// Handles a raw chunk that may hold several lines.
    pub fn handle_chunk(&self, chunk: &str) {
        for line in chunk.lines() {
            self.handle_line(line);
        }
    }

    /// Handles one line of output.
    pub fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let event = match parse_line(line) {
            Ok(event) => event,
            Err(LineError::Malformed(e)) => {
                tracing::warn!(subnet = %self.subnet, error = %e, "Ignoring malformed subnet event: {line}");
                return;
            }
            Err(LineError::Invalid(_, e)) => {
                tracing::warn!(subnet = %self.subnet, error = %e, "Cannot handle subnet event: {line}");
                return;
            }
        };

        match event {
            SubnetEvent::Started => {
                self.activity
                    .info(&self.subnet, format!("{} started", self.display));
            }
            SubnetEvent::Info { message, subnet } => {
                let source = subnet.as_deref().unwrap_or(&*self.subnet);
                self.activity.info(source, self.normalize(&message));
            }
            SubnetEvent::Error { message, subnet } => {
                let source = subnet.as_deref().unwrap_or(&*self.subnet);
                self.activity.error(source, self.normalize(&message));
            }
            SubnetEvent::JobsCompleted { total } => {
                self.metrics.submit(&self.subnet, PartialMetrics::jobs(total));
            }
            SubnetEvent::Unknown => {
                tracing::debug!(subnet = %self.subnet, "Ignoring subnet event of unknown type: {line}");
            }
        }
    }

    fn normalize(&self, message: &str) -> String {
        message.replacen(GENERIC_RUNTIME_NAME, &self.display, 1)
    }
}
