//! # SubscriberSet: ordered synchronous fan-out
//!
//! [`SubscriberSet`] delivers each event to every registered subscriber on the
//! caller's task.
//!
//! ## What it guarantees
//! - Delivery in registration order.
//! - Subscribers added while an event is being delivered see the next event,
//!   not the current one (delivery iterates over a snapshot).
//! - Panics inside subscribers are caught and logged (isolation).
//!
//! ## What it does **not** do
//! - No buffering or back-pressure: a slow subscriber slows the publisher.
//!
//! ## Diagram
//! ```text
//!    emit(&E)
//!        ├──► S1.on_event()
//!        ├──► S2.on_event()
//!        └──► SN.on_event()
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use super::Subscribe;

/// Registration-ordered list of subscribers.
pub struct SubscriberSet<E> {
    subs: RwLock<Vec<Arc<dyn Subscribe<E>>>>,
}

impl<E: 'static> Default for SubscriberSet<E> {
    fn default() -> Self {
        Self {
            subs: RwLock::new(Vec::new()),
        }
    }
}

impl<E: 'static> SubscriberSet<E> {
    /// Creates a set pre-populated with `subs`, in order.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe<E>>>) -> Self {
        Self {
            subs: RwLock::new(subs),
        }
    }

    /// Appends a subscriber; it stays registered for the lifetime of the set.
    pub fn add(&self, sub: Arc<dyn Subscribe<E>>) {
        self.subs
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(sub);
    }

    /// Delivers `event` to every subscriber in registration order.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Arc<dyn Subscribe<E>>> = self
            .subs
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();

        for sub in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                let info = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(subscriber = sub.name(), %info, "subscriber panicked");
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.read().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::FnSubscriber;
    use std::sync::Mutex;

    #[test]
    fn delivers_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set: SubscriberSet<u32> = SubscriberSet::default();
        for id in 0..3 {
            let seen = seen.clone();
            set.add(Arc::new(FnSubscriber::new("rec", move |v: &u32| {
                seen.lock().unwrap().push((id, *v));
            })));
        }

        set.emit(&7);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn panicking_subscriber_does_not_starve_the_rest() {
        let hits = Arc::new(Mutex::new(0));
        let set: SubscriberSet<()> = SubscriberSet::default();
        set.add(Arc::new(FnSubscriber::new("boom", |_: &()| panic!("boom"))));
        let h = hits.clone();
        set.add(Arc::new(FnSubscriber::new("count", move |_: &()| {
            *h.lock().unwrap() += 1;
        })));

        set.emit(&());
        set.emit(&());
        assert_eq!(*hits.lock().unwrap(), 2);
    }

    #[test]
    fn empty_set() {
        let set: SubscriberSet<u8> = SubscriberSet::new(Vec::new());
        assert!(set.is_empty());
        set.emit(&1);
    }
}
