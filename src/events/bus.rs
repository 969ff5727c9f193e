//! # Broadcast bus for the agent event stream.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] carrying
//! [`AgentEvent`]s to presentation layers (`--json` output, tailing views).
//!
//! ## Architecture
//! ```text
//! Publishers:                           Receivers (many):
//!   ActivityHub  ── bridge ──┐
//!                            ├──► Bus ──► bus.subscribe() ──► consumer
//!   MetricsAggregator ─ bridge ┘   (broadcast chan)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never waits for receivers.
//! - **Bounded capacity**: receivers that fall behind observe `RecvError::Lagged(n)`.
//! - **No persistence**: events sent while nobody listens are dropped.

use tokio::sync::broadcast;

use super::event::AgentEvent;

/// Broadcast channel for [`AgentEvent`]s. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<AgentEvent>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<AgentEvent>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: AgentEvent) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_every_receiver() {
        let bus = Bus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(AgentEvent::JobsCompleted { total: 3 });

        assert_eq!(a.recv().await.unwrap(), AgentEvent::JobsCompleted { total: 3 });
        assert_eq!(b.recv().await.unwrap(), AgentEvent::JobsCompleted { total: 3 });
        assert_eq!(bus.receiver_count(), 2);
    }

    #[test]
    fn publish_without_receivers_is_fine() {
        Bus::new(0).publish(AgentEvent::JobsCompleted { total: 1 });
    }
}
