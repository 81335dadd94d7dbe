//! # Cluster capabilities consumed by the runtime.
//!
//! The orchestrator never talks to a cluster API directly. It is handed three
//! feeds, each a pair of "list now" and "watch changes" capabilities, and the
//! log feed that opens one process's output:
//!
//! ```text
//! PartitionFeed ──► core::watcher     (which partitions exist)
//! WorkloadFeed  ──► core::discoverer  (which workloads run in a partition)
//! LogFeed       ──► core::runner      (lines of one process)
//! ```
//!
//! Transport, authentication and rate limiting are the implementor's business.
//! [`lines`] helps adapt any byte stream to a [`LineStream`]; [`MemoryCluster`]
//! implements all three feeds in process.
//!
//! ## Rules
//! - Watch streams yield events after the watch was established; callers
//!   subscribe **before** listing so nothing between the two is missed.
//! - A watch stream that ends (returns `None`) means the feed is gone.
//! - A [`LineStream`] that ends cleanly means the producer closed the feed.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ClientError;

mod lines;
pub mod memory;
mod types;

pub use lines::lines;
pub use memory::MemoryCluster;
pub use types::{ClientConfig, LogRequest, PartitionEvent, Phase, Workload, WorkloadEvent};

/// Stream of watch events.
pub type WatchStream<T> = BoxStream<'static, Result<T, ClientError>>;

/// Stream of output lines (without trailing newlines).
pub type LineStream = BoxStream<'static, Result<String, ClientError>>;

/// Lists and watches partitions (namespaces).
#[async_trait]
pub trait PartitionFeed: Send + Sync + 'static {
    /// Names of all partitions that exist now.
    async fn list_partitions(&self) -> Result<Vec<Arc<str>>, ClientError>;

    /// Partition changes from now on.
    async fn watch_partitions(&self) -> Result<WatchStream<PartitionEvent>, ClientError>;
}

/// Lists and watches workloads (pods) inside one partition.
#[async_trait]
pub trait WorkloadFeed: Send + Sync + 'static {
    /// Snapshots of all workloads in `partition`.
    async fn list_workloads(&self, partition: &str) -> Result<Vec<Workload>, ClientError>;

    /// Workload changes in `partition` from now on.
    async fn watch_workloads(
        &self,
        partition: &str,
    ) -> Result<WatchStream<WorkloadEvent>, ClientError>;
}

/// Opens the output of one process.
#[async_trait]
pub trait LogFeed: Send + Sync + 'static {
    /// Opens a line stream for `request`.
    async fn open_logs(&self, request: &LogRequest) -> Result<LineStream, ClientError>;
}
