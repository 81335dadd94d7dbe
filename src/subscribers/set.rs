//! # SubscriberSet: synchronous fan-out over multiple subscribers
//!
//! [`SubscriberSet`] hands each [`Event`](crate::events::Event) to every
//! subscriber in registration order, on the caller's task.
//!
//! ## What it guarantees
//! - Per-publisher FIFO: events emitted by one task reach each subscriber in order.
//! - Panics inside subscribers are caught and logged (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across publishers (different identities interleave).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │
//!        ├──► catch_unwind(S1.on_event)
//!        ├──► catch_unwind(S2.on_event)
//!        └──► catch_unwind(SN.on_event)
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::events::Event;

use super::Subscribe;

/// Composite fan-out shared by every publisher of one orchestrator.
#[derive(Clone, Default)]
pub struct SubscriberSet {
    subs: Arc<[Arc<dyn Subscribe>]>,
}

impl SubscriberSet {
    /// Creates a new set.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subs: subs.into() }
    }

    /// Fan-out one event to all subscribers.
    ///
    /// A subscriber that panics is logged with its name and skipped for this event.
    pub fn emit(&self, event: &Event) {
        for sub in self.subs.iter() {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                tracing::warn!(
                    subscriber = sub.name(),
                    kind = ?event.kind,
                    info = %panic_message(panic_err.as_ref()),
                    "subscriber panicked"
                );
            }
        }
    }

    /// Emits an owned event (convenience for builder-style construction).
    #[inline]
    pub fn publish(&self, event: Event) {
        self.emit(&event);
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }
}

/// Renders a panic payload if it is a string.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl Subscribe for Counter {
        fn on_event(&self, _: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicker;

    impl Subscribe for Panicker {
        fn on_event(&self, _: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let set = SubscriberSet::new(vec![Arc::new(Panicker), counter.clone()]);

        set.publish(Event::new(EventKind::ShutdownRequested));
        set.publish(Event::new(EventKind::AllStoppedWithin));

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_panic_message_extracts_strings() {
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        let fixed: Box<dyn std::any::Any + Send> = Box::new("fixed");
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(fixed.as_ref()), "fixed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
