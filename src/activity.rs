//! # ActivityHub: fan-out point for activity notices.
//!
//! Subnets (through the event pipeline) and the agent itself publish
//! [`ActivityEvent`]s here; every registered subscriber gets each notice
//! synchronously, in registration order. One hub is created per agent and
//! passed down explicitly.

use std::sync::Arc;

use crate::events::{ActivityEvent, STATION_SOURCE};
use crate::subscribers::{FnSubscriber, Subscribe, SubscriberSet};

/// Synchronous publish/subscribe for activity notices.
#[derive(Default)]
pub struct ActivityHub {
    subs: SubscriberSet<ActivityEvent>,
}

impl ActivityHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every subscriber before returning.
    pub fn submit(&self, event: ActivityEvent) {
        self.subs.emit(&event);
    }

    /// Registers a subscriber for the rest of the hub's lifetime.
    pub fn subscribe(&self, sub: Arc<dyn Subscribe<ActivityEvent>>) {
        self.subs.add(sub);
    }

    /// Registers a closure.
    pub fn subscribe_fn<F>(&self, name: &'static str, f: F)
    where
        F: Fn(&ActivityEvent) + Send + Sync + 'static,
    {
        self.subs.add(Arc::new(FnSubscriber::new(name, f)));
    }

    /// Publishes an informational notice.
    pub fn info(&self, source: &str, message: impl Into<String>) {
        self.submit(ActivityEvent::info(source, message));
    }

    /// Publishes an error notice.
    pub fn error(&self, source: &str, message: impl Into<String>) {
        self.submit(ActivityEvent::error(source, message));
    }

    /// Informational notice from the agent itself.
    pub fn station_info(&self, message: impl Into<String>) {
        self.info(STATION_SOURCE, message);
    }

    /// Error notice from the agent itself.
    pub fn station_error(&self, message: impl Into<String>) {
        self.error(STATION_SOURCE, message);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ActivityKind;
    use std::sync::Mutex;

    #[test]
    fn subscribers_see_every_notice_in_order() {
        let hub = ActivityHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let log = log.clone();
            hub.subscribe_fn("rec", move |ev: &ActivityEvent| {
                log.lock().unwrap().push(format!("{tag}:{}", ev.message));
            });
        }

        hub.info("spark", "Spark started");
        hub.station_error("Failed to update subnet source code");

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:Spark started",
                "b:Spark started",
                "a:Failed to update subnet source code",
                "b:Failed to update subnet source code",
            ]
        );
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[test]
    fn station_notices_use_station_source() {
        let hub = ActivityHub::new();
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        hub.subscribe_fn("rec", move |ev: &ActivityEvent| {
            *slot.lock().unwrap() = Some((ev.kind, ev.source.to_string()));
        });
        hub.station_info("Subnet source code up to date");
        assert_eq!(
            *seen.lock().unwrap(),
            Some((ActivityKind::Info, "Station".to_string()))
        );
    }

    #[test]
    fn submit_without_subscribers() {
        ActivityHub::new().submit(ActivityEvent::info("spark", "nobody listens"));
    }
}
