//! # streamvisor
//!
//! **Streamvisor** discovers running workloads across the partitions of a
//! cluster and streams the output of every process in them to the console and,
//! optionally, to one file per process. It keeps up on its own as partitions,
//! workloads and processes come and go.
//!
//! The cluster itself is reached through three small feed traits
//! ([`PartitionFeed`], [`WorkloadFeed`], [`LogFeed`]); the crate ships an
//! in-memory implementation, [`MemoryCluster`], for tests and demos.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                     Selector (include / exclude patterns)
//!                                   │
//!  PartitionFeed ──► PartitionWatcher ──► PartitionSet
//!                                          │   one task per partition
//!                        ┌─────────────────┼─────────────────┐
//!                        ▼                 ▼                 ▼
//!  WorkloadFeed ──► Discoverer        Discoverer        Discoverer
//!                        │  start / stop per running workload process
//!                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StreamSupervisor (identity → slot)                               │
//! │  - at most one task per (partition, workload, process)            │
//! │  - optional admission semaphore (Config::max_concurrent)          │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   StreamActor        StreamActor        StreamActor   (retry loop)
//!        │ LogFeed::open_logs(since)
//!        ▼
//!   StreamWriter ──► console "[p/w:c] line"
//!        │       └─► <tee>/<p>/<w>/<c>.log (created on first line)
//!        ▼
//!   SubscriberSet ──► Subscribe::on_event (synchronous, panics contained)
//! ```
//!
//! ### Stream lifecycle
//! ```text
//! start(id) ──► StreamStarted
//! loop {
//!   ├─► acquire admission permit (optional, cancellable)
//!   ├─► open_logs(now - since) and forward every line
//!   │       ├─ cancelled          ─► exit
//!   │       ├─ lines delivered    ─► failures = 0
//!   │       └─ error / empty EOF  ─► failures += 1, publish Error
//!   ├─► failures == max_attempts ─► RetryExhausted, exit
//!   └─► BackoffScheduled{ attempt, delay }, sleep (cancellable)
//! }
//! close file ──► FileClosed ──► StreamStopped{ reason }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                                  |
//! |-------------------|----------------------------------------------------------|-----------------------------------------------------|
//! | **Scope**         | Literal and glob partition selection.                    | [`Selector`], [`NamePattern`]                       |
//! | **Orchestration** | Start, stop and signal-driven shutdown.                  | [`Orchestrator`], [`OrchestratorBuilder`]           |
//! | **Supervision**   | Per-identity stream tasks with bounded retry.            | [`StreamSupervisor`], [`BackoffPolicy`]             |
//! | **Output**        | Console and lazily created per-process files.            | [`OutputDestination`], [`StreamWriter`]             |
//! | **Subscriber API**| Typed lifecycle events and callbacks.                    | [`Subscribe`], [`Callbacks`], [`Event`]             |
//! | **Cluster**       | Feed traits, line decoding, in-memory cluster.           | [`LogFeed`], [`lines`], [`MemoryCluster`]           |
//! | **Errors**        | Typed errors with stable labels.                         | [`StreamError`], [`RuntimeError`]                   |
//!
//! ## Optional features
//! - `logging`: exports the [`LogWriter`] subscriber that forwards events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use streamvisor::{
//!     Callbacks, Config, MemoryCluster, Orchestrator, OutputDestination, Phase, Selector,
//!     StreamIdentity, Workload,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cluster = Arc::new(MemoryCluster::new());
//!     cluster.add_partition("default");
//!     cluster.put_workload("default", Workload::new("web-0", Phase::Running, ["nginx"]));
//!     cluster.push_line(&StreamIdentity::new("default", "web-0", "nginx"), "GET / 200");
//!
//!     let cfg = Config {
//!         output: OutputDestination::console().with_silent(true),
//!         ..Config::default()
//!     };
//!     let orch = Orchestrator::builder(cfg)
//!         .with_cluster(cluster)
//!         .with_callbacks(Callbacks::new().on_log_line(|id, line| println!("{id}: {line}")))
//!         .build()?;
//!
//!     let runner = orch.clone();
//!     let handle = tokio::spawn(async move {
//!         runner.start_streaming(Selector::new(["default"], Vec::<&str>::new())?, Duration::from_secs(60)).await?;
//!         Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
//!     });
//!
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     orch.stop_streaming().await?;
//!     handle.await?.map_err(|e| e.to_string())?;
//!     Ok(())
//! }
//! ```
mod cluster;
mod core;
mod error;
mod events;
mod identity;
mod policies;
mod selector;
mod sink;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use cluster::memory::OpenFault;
pub use cluster::{
    ClientConfig, LineStream, LogFeed, LogRequest, MemoryCluster, PartitionEvent, PartitionFeed,
    Phase, WatchStream, Workload, WorkloadEvent, WorkloadFeed, lines,
};
pub use crate::core::{Config, Orchestrator, OrchestratorBuilder, StreamSupervisor};
pub use error::{ClientError, DestinationError, PatternError, RuntimeError, StreamError};
pub use events::{Event, EventKind};
pub use identity::StreamIdentity;
pub use policies::{BackoffPolicy, JitterPolicy};
pub use selector::{NamePattern, Selector, split_list};
pub use sink::{OutputDestination, OutputSink, StreamWriter};
pub use subscribers::{Callbacks, Subscribe, SubscriberSet};

// Optional: expose the tracing-backed subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
