//! # Slot table: keyed arena of cancellable tasks.
//!
//! Both the stream supervisor (keyed by [`StreamIdentity`](crate::StreamIdentity))
//! and the partition set (keyed by partition name) keep their live tasks here.
//!
//! ## Architecture
//! ```text
//! acquire(key) ──► Running  ──stop(key)──► Terminating
//!      │                                                   │
//!      │ (key Terminating: new lease waits on `after`)     │ finished.cancelled()
//!      ▼                                                   ▼
//!   Lease{id, cancel, after, finished}                release(key, id) ──► removed
//! ```
//!
//! ## Rules
//! - At most one `Running` slot per key: a second `acquire` returns `None`.
//! - `release(key, id)` only removes the slot it was issued for, so a stale
//!   release never evicts a successor.
//! - The lock is held for short map edits only, never across task completion.
//! - The spawned task holds `finished.drop_guard()`; `stop` returns once it fires,
//!   i.e. after the task dropped everything it owned.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;

/// Status of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotStatus {
    /// Task currently running.
    Running,
    /// Task is being cancelled and has not finished yet.
    Terminating,
}

struct Slot {
    id: u64,
    cancel: CancellationToken,
    finished: CancellationToken,
    status: SlotStatus,
}

/// What the owner of a freshly acquired slot needs to run its task.
pub(crate) struct Lease {
    /// Slot id, for [`SlotTable::release`].
    pub id: u64,
    /// Cancelled by `stop*` or by the parent token.
    pub cancel: CancellationToken,
    /// Fires when the predecessor under the same key has finished.
    pub after: Option<CancellationToken>,
    /// Must be fired (via `drop_guard`) when the task has released everything.
    pub finished: CancellationToken,
}

/// Keyed table of task slots.
pub(crate) struct SlotTable<K> {
    slots: RwLock<HashMap<K, Slot>>,
    next_id: AtomicU64,
    drained: Notify,
}

impl<K> SlotTable<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            drained: Notify::new(),
        }
    }

    /// Claims `key`. Returns `None` if it is already running or `parent` is cancelled.
    pub(crate) async fn acquire(&self, key: K, parent: &CancellationToken) -> Option<Lease> {
        let mut slots = self.slots.write().await;
        if parent.is_cancelled() {
            return None;
        }
        let after = match slots.get(&key) {
            Some(Slot {
                status: SlotStatus::Running,
                ..
            }) => return None,
            Some(prev) => Some(prev.finished.clone()),
            None => None,
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = parent.child_token();
        let finished = CancellationToken::new();
        slots.insert(
            key,
            Slot {
                id,
                cancel: cancel.clone(),
                finished: finished.clone(),
                status: SlotStatus::Running,
            },
        );
        Some(Lease {
            id,
            cancel,
            after,
            finished,
        })
    }

    /// Removes the slot for `key` if it is still the one issued as `id`.
    pub(crate) async fn release(&self, key: &K, id: u64) -> bool {
        let mut slots = self.slots.write().await;
        let removed = match slots.get(key) {
            Some(slot) if slot.id == id => slots.remove(key).is_some(),
            _ => false,
        };
        if slots.is_empty() {
            self.drained.notify_waiters();
        }
        removed
    }

    /// Cancels the task under `key` and waits until it finished. Returns false if untracked.
    pub(crate) async fn stop(&self, key: &K) -> bool {
        self.stop_where(|k| k == key).await > 0
    }

    /// Cancels every task whose key matches and waits for all of them.
    ///
    /// Returns the number of tasks stopped.
    pub(crate) async fn stop_where<F>(&self, pred: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let targets: Vec<(K, u64, CancellationToken)> = {
            let mut slots = self.slots.write().await;
            slots
                .iter_mut()
                .filter(|(k, _)| pred(*k))
                .map(|(k, slot)| {
                    slot.status = SlotStatus::Terminating;
                    slot.cancel.cancel();
                    (k.clone(), slot.id, slot.finished.clone())
                })
                .collect()
        };

        join_all(targets.iter().map(|(_, _, finished)| finished.cancelled())).await;
        for (key, id, _) in &targets {
            self.release(key, *id).await;
        }
        targets.len()
    }

    /// Cancels and awaits every task. Idempotent.
    pub(crate) async fn stop_all(&self) -> usize {
        self.stop_where(|_| true).await
    }

    /// Sorted keys of every tracked slot.
    pub(crate) async fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.slots.read().await.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub(crate) async fn contains(&self, key: &K) -> bool {
        self.slots.read().await.contains_key(key)
    }

    pub(crate) async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Resolves once the table is empty.
    pub(crate) async fn wait_empty(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.slots.read().await.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn_until_cancelled(lease: Lease) {
        tokio::spawn(async move {
            let _done = lease.finished.drop_guard();
            lease.cancel.cancelled().await;
        });
    }

    #[tokio::test]
    async fn test_second_acquire_is_refused() {
        let table: SlotTable<&str> = SlotTable::new();
        let root = CancellationToken::new();
        let first = table.acquire("a", &root).await;
        assert!(first.is_some());
        assert!(table.acquire("a", &root).await.is_none());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_stop_waits_for_finish_and_untracks() {
        let table: SlotTable<&str> = SlotTable::new();
        let root = CancellationToken::new();
        let lease = table.acquire("a", &root).await.unwrap();
        let finished = lease.finished.clone();
        spawn_until_cancelled(lease);

        assert!(table.stop(&"a").await);
        assert!(finished.is_cancelled());
        assert!(!table.contains(&"a").await);
        assert!(!table.stop(&"a").await);
    }

    #[tokio::test]
    async fn test_stop_all_is_idempotent() {
        let table: SlotTable<u32> = SlotTable::new();
        let root = CancellationToken::new();
        for k in 0..3 {
            let lease = table.acquire(k, &root).await.unwrap();
            spawn_until_cancelled(lease);
        }
        assert_eq!(table.stop_all().await, 3);
        assert_eq!(table.stop_all().await, 0);
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn test_stale_release_keeps_successor() {
        let table: SlotTable<&str> = SlotTable::new();
        let root = CancellationToken::new();
        let old = table.acquire("a", &root).await.unwrap();
        assert!(table.release(&"a", old.id).await);
        let new = table.acquire("a", &root).await.unwrap();
        assert!(!table.release(&"a", old.id).await);
        assert!(table.contains(&"a").await);
        assert!(new.after.is_none());
    }

    #[tokio::test]
    async fn test_successor_waits_for_terminating_predecessor() {
        let table = Arc::new(SlotTable::<&str>::new());
        let root = CancellationToken::new();
        let old = table.acquire("a", &root).await.unwrap();
        let old_finished = old.finished.clone();
        // The old task ignores cancellation until released by hand.
        let gate = CancellationToken::new();
        let gate2 = gate.clone();
        tokio::spawn(async move {
            let _done = old.finished.drop_guard();
            gate2.cancelled().await;
        });

        let t = table.clone();
        let stopper = tokio::spawn(async move { t.stop(&"a").await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let new = table.acquire("a", &root).await.unwrap();
        let after = new.after.clone().unwrap();
        assert!(!after.is_cancelled());

        gate.cancel();
        after.cancelled().await;
        assert!(old_finished.is_cancelled());
        assert!(stopper.await.unwrap_or(false));
        // The successor survived the predecessor's release and still holds the key.
        assert!(table.contains(&"a").await);
        assert!(table.acquire("a", &root).await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_parent_refuses() {
        let table: SlotTable<&str> = SlotTable::new();
        let root = CancellationToken::new();
        root.cancel();
        assert!(table.acquire("a", &root).await.is_none());
    }

    #[tokio::test]
    async fn test_wait_empty_resolves_after_release() {
        let table = Arc::new(SlotTable::<&str>::new());
        let root = CancellationToken::new();
        let lease = table.acquire("a", &root).await.unwrap();

        let t = table.clone();
        let waiter = tokio::spawn(async move { t.wait_empty().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        table.release(&"a", lease.id).await;
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
