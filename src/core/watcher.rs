//! # Partition watcher.
//!
//! Turns the partition feed into add/remove calls on the [`PartitionSet`],
//! filtered through the [`Selector`]. Only edges matter: a re-delivered
//! `Added` for a served partition does nothing.
//!
//! ```text
//! handshake():  watch_partitions ──► list_partitions ──► add(p) for p in scope
//!                      │ error                │ error
//!                      └──────────► RuntimeError::Handshake
//! follow():     Added(p) in scope ──► add(p)
//!               Removed(p)        ──► remove(p)
//!               stream ends/fails ──► publish Error(Discovery{scope: "partitions"}), return
//! ```

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::cluster::{PartitionEvent, PartitionFeed, WatchStream};
use crate::core::partitions::PartitionSet;
use crate::error::{ClientError, RuntimeError, StreamError};
use crate::events::Event;
use crate::selector::Selector;
use crate::subscribers::SubscriberSet;

/// Scope name used for errors of the partition feed itself.
pub(crate) const PARTITIONS_SCOPE: &str = "partitions";

pub(crate) struct PartitionWatcher {
    feed: Arc<dyn PartitionFeed>,
    selector: Selector,
    partitions: PartitionSet,
    subs: SubscriberSet,
}

impl PartitionWatcher {
    pub(crate) fn new(
        feed: Arc<dyn PartitionFeed>,
        selector: Selector,
        partitions: PartitionSet,
        subs: SubscriberSet,
    ) -> Self {
        Self {
            feed,
            selector,
            partitions,
            subs,
        }
    }

    /// Subscribes, lists and serves every partition in scope.
    ///
    /// # Errors
    /// [`RuntimeError::Handshake`] if either call fails.
    pub(crate) async fn handshake(&self) -> Result<WatchStream<PartitionEvent>, RuntimeError> {
        let events = self
            .feed
            .watch_partitions()
            .await
            .map_err(|source| RuntimeError::Handshake { source })?;
        let names = self
            .feed
            .list_partitions()
            .await
            .map_err(|source| RuntimeError::Handshake { source })?;

        for name in names {
            if self.selector.resolve(&name) {
                self.partitions.add(name).await;
            }
        }
        Ok(events)
    }

    /// Applies partition events until cancelled or until the feed ends.
    pub(crate) async fn follow(
        &self,
        mut events: WatchStream<PartitionEvent>,
        token: &CancellationToken,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                ev = events.next() => ev,
            };
            match next {
                Some(Ok(PartitionEvent::Added(name))) => {
                    if self.selector.resolve(&name) {
                        self.partitions.add(name).await;
                    }
                }
                Some(Ok(PartitionEvent::Removed(name))) => {
                    self.partitions.remove(&name).await;
                }
                Some(Err(source)) => return self.lost(source),
                None => return self.lost(ClientError::Stream("partition watch closed".into())),
            }
        }
    }

    fn lost(&self, source: ClientError) {
        self.subs.publish(
            Event::error(StreamError::Discovery {
                scope: PARTITIONS_SCOPE.to_string(),
                source,
            })
            .with_partition(PARTITIONS_SCOPE),
        );
    }
}
