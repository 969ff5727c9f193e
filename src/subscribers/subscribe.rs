//! # Core subscriber trait
//!
//! `Subscribe<E>` is the extension point for plugging consumers into the
//! [`ActivityHub`](crate::ActivityHub) (`E = ActivityEvent`) and the
//! [`MetricsAggregator`](crate::MetricsAggregator) (`E = MetricsSnapshot`).
//!
//! ## Contract
//! - `on_event` is called **synchronously** on the publisher's task, in
//!   registration order. It must not block; hand slow work to a channel.
//! - A panicking subscriber is isolated: the panic is logged and the remaining
//!   subscribers still receive the event.
//!
//! ## Example
//! ```rust
//! use subnetvisor::{ActivityEvent, Subscribe};
//!
//! struct Audit;
//!
//! impl Subscribe<ActivityEvent> for Audit {
//!     fn on_event(&self, ev: &ActivityEvent) {
//!         let _ = ev; // write audit record...
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

/// Contract for synchronous event subscribers.
pub trait Subscribe<E>: Send + Sync + 'static {
    /// Handle a single event.
    fn on_event(&self, event: &E);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed subscriber.
///
/// The name given to [`FnSubscriber::new`] is what [`Subscribe::name`]
/// returns, so panic logs identify the closure.
pub struct FnSubscriber<F> {
    name: &'static str,
    f: F,
}

impl<F> FnSubscriber<F> {
    /// Wraps `f` under the given name.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<E, F> Subscribe<E> for FnSubscriber<F>
where
    F: Fn(&E) + Send + Sync + 'static,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_subscriber_reports_its_registered_name() {
        let sub = FnSubscriber::new("audit", |_: &u8| {});
        assert_eq!(Subscribe::<u8>::name(&sub), "audit");
    }
}
