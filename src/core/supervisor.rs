//! # StreamSupervisor: identity → task table.
//!
//! The [`StreamSupervisor`] owns every stream task of one orchestrator. Each
//! task is a [`StreamActor`] spawned into a slot of a [`SlotTable`] keyed by
//! [`StreamIdentity`].
//!
//! ## Key responsibilities
//! - enforce **at most one** live task per identity (`start` is idempotent)
//! - stop single identities, whole workloads, whole partitions, or everything
//! - contain panics: a panicking actor is reported and its slot released
//!
//! ## Architecture
//! ```text
//! start(id) ──► SlotTable::acquire(id) ──► publish StreamStarted
//!                      │
//!                      └──► tokio::spawn {
//!                               finished.drop_guard()
//!                               catch_unwind(StreamActor::run(lease.cancel))
//!                               SlotTable::release(id, lease.id)
//!                           }
//!
//! stop(id) ──► cancel ──► await finished ──► release ──► true
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use streamvisor::{Config, MemoryCluster, Orchestrator, OutputDestination, StreamIdentity};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cluster = Arc::new(MemoryCluster::new());
//!     let cfg = Config { output: OutputDestination::console().with_silent(true), ..Config::default() };
//!     let orch = Orchestrator::builder(cfg).with_cluster(cluster).build()?;
//!
//!     let sup = orch.supervisor();
//!     let id = StreamIdentity::new("default", "web-0", "nginx");
//!     assert!(sup.start(id.clone(), Duration::from_secs(60)).await);
//!     assert!(!sup.start(id.clone(), Duration::from_secs(60)).await);
//!     assert!(sup.stop(&id).await);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::cluster::LogFeed;
use crate::core::actor::StreamActor;
use crate::core::slots::SlotTable;
use crate::error::StreamError;
use crate::events::{Event, EventKind};
use crate::identity::StreamIdentity;
use crate::policies::BackoffPolicy;
use crate::sink::OutputSink;
use crate::subscribers::{SubscriberSet, panic_message};

struct Inner {
    slots: Arc<SlotTable<StreamIdentity>>,
    feed: Arc<dyn LogFeed>,
    sink: OutputSink,
    subs: SubscriberSet,
    backoff: BackoffPolicy,
    semaphore: Option<Arc<Semaphore>>,
    runtime: CancellationToken,
}

/// Identity-keyed table of supervised stream tasks.
///
/// Cloning shares the same table.
#[derive(Clone)]
pub struct StreamSupervisor {
    inner: Arc<Inner>,
}

impl StreamSupervisor {
    pub(crate) fn new(
        feed: Arc<dyn LogFeed>,
        sink: OutputSink,
        subs: SubscriberSet,
        backoff: BackoffPolicy,
        semaphore: Option<Arc<Semaphore>>,
        runtime: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Arc::new(SlotTable::new()),
                feed,
                sink,
                subs,
                backoff,
                semaphore,
                runtime,
            }),
        }
    }

    /// Starts streaming `identity` from `now - since`.
    ///
    /// Returns false (and does nothing) if the identity is already tracked or
    /// the orchestrator is shutting down.
    pub async fn start(&self, identity: StreamIdentity, since: Duration) -> bool {
        let inner = &self.inner;
        let Some(lease) = inner.slots.acquire(identity.clone(), &inner.runtime).await else {
            return false;
        };
        inner
            .subs
            .publish(Event::new(EventKind::StreamStarted).with_identity(identity.clone()));

        let actor = StreamActor {
            identity: identity.clone(),
            feed: inner.feed.clone(),
            writer: inner.sink.writer(identity.clone()),
            subs: inner.subs.clone(),
            backoff: inner.backoff,
            since,
            semaphore: inner.semaphore.clone(),
            slots: inner.slots.clone(),
            slot_id: lease.id,
            after: lease.after,
        };

        let slots = inner.slots.clone();
        let subs = inner.subs.clone();
        let (id, cancel, finished) = (lease.id, lease.cancel, lease.finished);
        tokio::spawn(async move {
            let _done = finished.drop_guard();
            let res = std::panic::AssertUnwindSafe(actor.run(cancel))
                .catch_unwind()
                .await;
            if let Err(panic_err) = res {
                subs.publish(Event::error(StreamError::Panicked {
                    scope: identity.to_string(),
                    info: panic_message(panic_err.as_ref()),
                }));
                subs.publish(
                    Event::new(EventKind::StreamStopped)
                        .with_identity(identity.clone())
                        .with_reason("panicked"),
                );
            }
            slots.release(&identity, id).await;
        });
        true
    }

    /// Stops `identity` and waits until its task released its resources.
    ///
    /// Returns false if the identity was not tracked.
    pub async fn stop(&self, identity: &StreamIdentity) -> bool {
        self.inner.slots.stop(identity).await
    }

    /// Stops every process of `workload` in `partition`. Returns how many were stopped.
    pub async fn stop_workload(&self, partition: &str, workload: &str) -> usize {
        self.inner
            .slots
            .stop_where(|id| id.in_workload(partition, workload))
            .await
    }

    /// Stops every identity of `partition`. Returns how many were stopped.
    pub async fn stop_partition(&self, partition: &str) -> usize {
        self.inner
            .slots
            .stop_where(|id| id.in_partition(partition))
            .await
    }

    /// Stops everything and waits. Idempotent.
    pub async fn stop_all(&self) -> usize {
        self.inner.slots.stop_all().await
    }

    /// Tracked identities, sorted.
    pub async fn list(&self) -> Vec<StreamIdentity> {
        self.inner.slots.keys().await
    }

    /// True if `identity` has a live (or still unwinding) task.
    pub async fn is_tracked(&self, identity: &StreamIdentity) -> bool {
        self.inner.slots.contains(identity).await
    }

    /// Number of tracked identities.
    pub async fn len(&self) -> usize {
        self.inner.slots.len().await
    }

    /// True if nothing is tracked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
