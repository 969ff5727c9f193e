//! Forwards hub notifications onto the [`Bus`].

use crate::events::{ActivityEvent, AgentEvent, Bus};
use crate::metrics::MetricsSnapshot;
use crate::subscribers::Subscribe;

/// Publishes activity notices and merged metrics as [`AgentEvent`]s.
///
/// A merged metrics update produces a `jobs-completed` entry followed by the
/// full `metrics` entry.
pub struct BusForwarder {
    bus: Bus,
}

impl BusForwarder {
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }
}

impl Subscribe<ActivityEvent> for BusForwarder {
    fn on_event(&self, ev: &ActivityEvent) {
        self.bus.publish(AgentEvent::from(ev));
    }

    fn name(&self) -> &'static str {
        "BusForwarder"
    }
}

impl Subscribe<MetricsSnapshot> for BusForwarder {
    fn on_event(&self, m: &MetricsSnapshot) {
        self.bus.publish(AgentEvent::JobsCompleted {
            total: m.total_jobs_completed,
        });
        self.bus.publish(AgentEvent::from(m));
    }

    fn name(&self) -> &'static str {
        "BusForwarder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn metrics_become_two_stream_entries() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let fwd = BusForwarder::new(bus);

        Subscribe::<MetricsSnapshot>::on_event(
            &fwd,
            &MetricsSnapshot {
                total_jobs_completed: 5,
                rewards_scheduled_for_address: 10,
            },
        );

        assert_eq!(rx.recv().await.unwrap(), AgentEvent::JobsCompleted { total: 5 });
        assert_eq!(
            rx.recv().await.unwrap(),
            AgentEvent::Metrics {
                total_jobs_completed: 5,
                rewards_scheduled_for_address: 10
            }
        );
    }
}
