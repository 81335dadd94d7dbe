//! # Event subscribers for the streamvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] that fans
//! events out, and built-in implementations.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   StreamActor / StreamWriter / Orchestrator ── emit(&Event) ──► SubscriberSet
//!                                                                   │
//!                                                  ┌────────────────┼───────────┐
//!                                                  ▼                ▼           ▼
//!                                              Callbacks        LogWriter    Custom
//! ```
//!
//! ## Subscriber types
//! - **Closure-based**: [`Callbacks`], for the common lifecycle hooks.
//! - **Trait-based**: implement [`Subscribe`] for full event access.

mod callbacks;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod embedded;

pub use callbacks::Callbacks;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
