//! Reconnect policies.
//!
//! This module groups the knobs that control **how long** a stream waits
//! between attempts and **how many** consecutive failures it tolerates.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max / max_attempts + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering-herd reconnects
//!
//! ## Quick wiring
//! ```text
//! Config { backoff: BackoffPolicy, .. }
//!      └─► core::actor::StreamActor uses:
//!           - backoff.is_exhausted(failures) to give up
//!           - backoff.next(failures - 1) to schedule the next attempt
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s, 5 attempts, ±10% jitter.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
