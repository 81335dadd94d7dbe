//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into the
//! runtime. Subscribers are called **synchronously**, from the task that
//! published the event, through the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - `on_event` runs on the publishing task: a stream actor, a writer or the
//!   orchestrator. Keep it short and non-blocking; hand heavy work to a channel.
//! - Events of one identity arrive in publication order.
//! - A panic inside `on_event` is caught and logged; other subscribers still
//!   receive the event and the publisher keeps running.
//!
//! ## Example (skeleton)
//! ```rust
//! use streamvisor::{Event, EventKind, Subscribe};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! #[derive(Default)]
//! struct LineCounter(AtomicU64);
//!
//! impl Subscribe for LineCounter {
//!     fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::LogLine {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "line-counter" }
//! }
//! ```

use crate::events::Event;

/// Contract for event subscribers.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    ///
    /// # Parameters
    /// - `event`: Reference to the event (does not transfer ownership)
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
