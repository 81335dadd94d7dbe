//! Runtime events.
//!
//! This module holds the event **data model** emitted by the orchestrator,
//! the partition watcher, stream actors and stream writers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Publishers**: `Orchestrator`, `PartitionSet`, `StreamSupervisor`,
//!   `StreamActor`, `StreamWriter`.
//! - **Consumers**: [`SubscriberSet`](crate::SubscriberSet), which calls every
//!   [`Subscribe`](crate::Subscribe) synchronously from the publishing task.

mod event;

pub use event::{Event, EventKind};
