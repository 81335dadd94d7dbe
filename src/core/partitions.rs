//! # Partition set: one discoverer per in-scope partition.
//!
//! [`PartitionSet`] is the partition-level twin of the stream supervisor: a
//! [`SlotTable`] keyed by partition name whose tasks are [`Discoverer`]s.
//!
//! ```text
//! add(p) ──► acquire(p) ──► publish PartitionAdded ──► spawn {
//!                                                        wait for predecessor
//!                                                        Discoverer::run
//!                                                        publish Error(Discovery) on failure
//!                                                        supervisor.stop_partition(p)
//!                                                        release(p), publish PartitionRemoved
//!                                                     }
//! remove(p) ──► cancel ──► await finished (streams of p already stopped)
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::cluster::WorkloadFeed;
use crate::core::discoverer::Discoverer;
use crate::core::slots::SlotTable;
use crate::core::supervisor::StreamSupervisor;
use crate::error::StreamError;
use crate::events::{Event, EventKind};
use crate::subscribers::{SubscriberSet, panic_message};

struct Inner {
    slots: Arc<SlotTable<Arc<str>>>,
    feed: Arc<dyn WorkloadFeed>,
    supervisor: StreamSupervisor,
    subs: SubscriberSet,
    since: Duration,
    runtime: CancellationToken,
}

/// Partitions currently in scope, each with its own discoverer.
#[derive(Clone)]
pub(crate) struct PartitionSet {
    inner: Arc<Inner>,
}

impl PartitionSet {
    pub(crate) fn new(
        feed: Arc<dyn WorkloadFeed>,
        supervisor: StreamSupervisor,
        subs: SubscriberSet,
        since: Duration,
        runtime: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Arc::new(SlotTable::new()),
                feed,
                supervisor,
                subs,
                since,
                runtime,
            }),
        }
    }

    /// Starts discovery in `partition`. Returns false if it is already served.
    pub(crate) async fn add(&self, partition: Arc<str>) -> bool {
        let inner = &self.inner;
        let Some(lease) = inner.slots.acquire(partition.clone(), &inner.runtime).await else {
            return false;
        };
        inner
            .subs
            .publish(Event::new(EventKind::PartitionAdded).with_partition(partition.clone()));

        let mut discoverer = Discoverer::new(
            partition.clone(),
            inner.feed.clone(),
            inner.supervisor.clone(),
            inner.since,
        );
        let me = inner.clone();
        tokio::spawn(async move {
            let _done = lease.finished.drop_guard();
            let token = lease.cancel;

            let proceed = match lease.after {
                Some(prev) => tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    _ = prev.cancelled() => true,
                },
                None => true,
            };
            if proceed {
                let res = std::panic::AssertUnwindSafe(discoverer.run(&token))
                    .catch_unwind()
                    .await;
                match res {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        me.subs
                            .publish(Event::error(err).with_partition(partition.clone()));
                    }
                    Err(panic_err) => {
                        me.subs.publish(
                            Event::error(StreamError::Panicked {
                                scope: partition.to_string(),
                                info: panic_message(panic_err.as_ref()),
                            })
                            .with_partition(partition.clone()),
                        );
                    }
                }
            }

            me.supervisor.stop_partition(&partition).await;
            me.slots.release(&partition, lease.id).await;
            me.subs
                .publish(Event::new(EventKind::PartitionRemoved).with_partition(partition));
        });
        true
    }

    /// Stops discovery in `partition` and every stream in it.
    pub(crate) async fn remove(&self, partition: &str) -> bool {
        self.inner.slots.stop(&Arc::from(partition)).await
    }

    /// Stops every discoverer (and thereby every discovered stream). Idempotent.
    pub(crate) async fn stop_all(&self) -> usize {
        self.inner.slots.stop_all().await
    }

    /// Served partitions, sorted.
    pub(crate) async fn list(&self) -> Vec<Arc<str>> {
        self.inner.slots.keys().await
    }

    /// Resolves once no partition is served.
    pub(crate) async fn wait_empty(&self) {
        self.inner.slots.wait_empty().await
    }
}
