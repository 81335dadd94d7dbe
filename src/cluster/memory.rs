//! # In-process cluster.
//!
//! [`MemoryCluster`] implements [`PartitionFeed`], [`WorkloadFeed`] and
//! [`LogFeed`] over plain maps and broadcast channels. It backs the crate's
//! tests and the demo, and is a reference for writing a real client adapter.
//!
//! ## Behavior
//! - Every mutation (`add_partition`, `put_workload`, `set_phase`...) updates
//!   the listed state and notifies current watchers under one lock, so a
//!   subscribe-then-list caller never misses a change.
//! - Output lines are timestamped when pushed. `open_logs` replays the backlog
//!   strictly after `since`, then (with `follow`) delivers live lines until
//!   [`MemoryCluster::close_logs`] ends the feed cleanly.
//! - Faults can be injected per identity ([`OpenFault`]) and per partition.
//!
//! ```text
//! push_line(id, "x") ──► backlog[id] += (now, "x") ──► broadcast Line
//!                                                        │
//! open_logs(id, since) ──► backlog(> since) ++ live ◄────┘
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::cluster::{
    LineStream, LogFeed, LogRequest, PartitionEvent, PartitionFeed, Phase, WatchStream, Workload,
    WorkloadEvent, WorkloadFeed,
};
use crate::error::ClientError;
use crate::identity::StreamIdentity;

const WATCH_CAPACITY: usize = 256;
const LOG_CAPACITY: usize = 4096;

/// How `open_logs` should fail for an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenFault {
    /// Every open fails.
    Always,
    /// The next `n` opens fail, then opens succeed again.
    Times(u32),
}

#[derive(Clone, Debug)]
enum LogSignal {
    Line(Arc<str>),
    Close,
}

struct LogBuffer {
    backlog: Vec<(SystemTime, Arc<str>)>,
    tx: broadcast::Sender<LogSignal>,
}

impl LogBuffer {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(LOG_CAPACITY);
        Self {
            backlog: Vec::new(),
            tx,
        }
    }
}

struct State {
    partitions: BTreeMap<Arc<str>, BTreeMap<Arc<str>, Workload>>,
    partition_tx: broadcast::Sender<PartitionEvent>,
    workload_tx: HashMap<Arc<str>, broadcast::Sender<WorkloadEvent>>,
    logs: HashMap<StreamIdentity, LogBuffer>,
    open_faults: HashMap<StreamIdentity, OpenFault>,
    opens: HashMap<StreamIdentity, u32>,
    failing_listings: HashSet<Arc<str>>,
    partition_feed_down: bool,
}

impl State {
    fn workload_sender(&mut self, partition: &str) -> &broadcast::Sender<WorkloadEvent> {
        self.workload_tx
            .entry(Arc::from(partition))
            .or_insert_with(|| broadcast::channel(WATCH_CAPACITY).0)
    }
}

/// In-process implementation of every cluster feed.
///
/// Cloning shares the same state.
#[derive(Clone)]
pub struct MemoryCluster {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    /// Creates an empty cluster.
    pub fn new() -> Self {
        let (partition_tx, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(State {
                partitions: BTreeMap::new(),
                partition_tx,
                workload_tx: HashMap::new(),
                logs: HashMap::new(),
                open_faults: HashMap::new(),
                opens: HashMap::new(),
                failing_listings: HashSet::new(),
                partition_feed_down: false,
            })),
        }
    }

    // ---- partitions ----

    /// Creates a partition (no-op besides re-notifying if it already exists).
    pub fn add_partition(&self, name: &str) {
        let mut st = self.state.lock();
        let key: Arc<str> = Arc::from(name);
        st.partitions.entry(key.clone()).or_default();
        let _ = st.partition_tx.send(PartitionEvent::Added(key));
    }

    /// Deletes a partition and every workload in it.
    pub fn remove_partition(&self, name: &str) {
        let mut st = self.state.lock();
        if let Some((key, _)) = st.partitions.remove_entry(name) {
            let _ = st.partition_tx.send(PartitionEvent::Removed(key));
        }
    }

    /// Ends every current partition watch; later watches work again.
    pub fn close_partition_watch(&self) {
        let mut st = self.state.lock();
        st.partition_tx = broadcast::channel(WATCH_CAPACITY).0;
    }

    /// Makes both partition listing and watching fail (or recover).
    pub fn set_partition_feed_down(&self, down: bool) {
        self.state.lock().partition_feed_down = down;
    }

    // ---- workloads ----

    /// Inserts or replaces a workload, creating its partition if needed.
    ///
    /// Emits `Added` for a new name and `Updated` otherwise.
    pub fn put_workload(&self, partition: &str, workload: Workload) {
        let mut st = self.state.lock();
        let old = st
            .partitions
            .entry(Arc::from(partition))
            .or_default()
            .insert(workload.name.clone(), workload.clone());
        let event = match old {
            None => WorkloadEvent::Added(workload),
            Some(old) => WorkloadEvent::Updated {
                old: Some(old),
                new: workload,
            },
        };
        let _ = st.workload_sender(partition).send(event);
    }

    /// Changes the phase of an existing workload. Returns false if it is unknown.
    pub fn set_phase(&self, partition: &str, name: &str, phase: Phase) -> bool {
        let current = {
            let st = self.state.lock();
            st.partitions.get(partition).and_then(|ws| ws.get(name)).cloned()
        };
        match current {
            Some(mut w) => {
                w.phase = phase;
                self.put_workload(partition, w);
                true
            }
            None => false,
        }
    }

    /// Deletes a workload. Returns false if it is unknown.
    pub fn remove_workload(&self, partition: &str, name: &str) -> bool {
        let mut st = self.state.lock();
        let removed = st.partitions.get_mut(partition).and_then(|ws| ws.remove(name));
        match removed {
            Some(w) => {
                let _ = st.workload_sender(partition).send(WorkloadEvent::Removed(w));
                true
            }
            None => false,
        }
    }

    /// Makes workload listing in `partition` fail.
    pub fn fail_workload_listing(&self, partition: &str) {
        self.state.lock().failing_listings.insert(Arc::from(partition));
    }

    // ---- output ----

    /// Appends one line to a process's output.
    pub fn push_line(&self, identity: &StreamIdentity, line: &str) {
        let mut st = self.state.lock();
        let buf = st.logs.entry(identity.clone()).or_insert_with(LogBuffer::new);
        let line: Arc<str> = Arc::from(line);
        buf.backlog.push((SystemTime::now(), line.clone()));
        let _ = buf.tx.send(LogSignal::Line(line));
    }

    /// Ends every open follow stream of `identity` cleanly (EOF).
    pub fn close_logs(&self, identity: &StreamIdentity) {
        let st = self.state.lock();
        if let Some(buf) = st.logs.get(identity) {
            let _ = buf.tx.send(LogSignal::Close);
        }
    }

    /// Injects an open failure for `identity`.
    pub fn fail_opens(&self, identity: &StreamIdentity, fault: OpenFault) {
        self.state.lock().open_faults.insert(identity.clone(), fault);
    }

    /// Removes any injected open failure for `identity`.
    pub fn heal_opens(&self, identity: &StreamIdentity) {
        self.state.lock().open_faults.remove(identity);
    }

    /// Number of `open_logs` calls made for `identity`, failed ones included.
    pub fn open_count(&self, identity: &StreamIdentity) -> u32 {
        self.state.lock().opens.get(identity).copied().unwrap_or(0)
    }

    /// Number of currently subscribed follow streams for `identity`.
    pub fn followers(&self, identity: &StreamIdentity) -> usize {
        self.state
            .lock()
            .logs
            .get(identity)
            .map_or(0, |b| b.tx.receiver_count())
    }
}

fn watch<T>(rx: broadcast::Receiver<T>) -> WatchStream<T>
where
    T: Clone + Send + 'static,
{
    stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(ev) => Some((Ok(ev), rx)),
            Err(broadcast::error::RecvError::Lagged(n)) => Some((
                Err(ClientError::Stream(format!("watch lagged by {n} events"))),
                rx,
            )),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    })
    .boxed()
}

fn follow(rx: broadcast::Receiver<LogSignal>) -> LineStream {
    stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(LogSignal::Line(line)) => Some((Ok(line.to_string()), rx)),
            Ok(LogSignal::Close) | Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(n)) => Some((
                Err(ClientError::Stream(format!("output lagged by {n} lines"))),
                rx,
            )),
        }
    })
    .boxed()
}

#[async_trait]
impl PartitionFeed for MemoryCluster {
    async fn list_partitions(&self) -> Result<Vec<Arc<str>>, ClientError> {
        let st = self.state.lock();
        if st.partition_feed_down {
            return Err(ClientError::Request("partition feed unavailable".into()));
        }
        Ok(st.partitions.keys().cloned().collect())
    }

    async fn watch_partitions(&self) -> Result<WatchStream<PartitionEvent>, ClientError> {
        let st = self.state.lock();
        if st.partition_feed_down {
            return Err(ClientError::Request("partition feed unavailable".into()));
        }
        Ok(watch(st.partition_tx.subscribe()))
    }
}

#[async_trait]
impl WorkloadFeed for MemoryCluster {
    async fn list_workloads(&self, partition: &str) -> Result<Vec<Workload>, ClientError> {
        let st = self.state.lock();
        if st.failing_listings.contains(partition) {
            return Err(ClientError::Request(format!("cannot list workloads in {partition}")));
        }
        Ok(st
            .partitions
            .get(partition)
            .map(|ws| ws.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn watch_workloads(
        &self,
        partition: &str,
    ) -> Result<WatchStream<WorkloadEvent>, ClientError> {
        let mut st = self.state.lock();
        Ok(watch(st.workload_sender(partition).subscribe()))
    }
}

#[async_trait]
impl LogFeed for MemoryCluster {
    async fn open_logs(&self, request: &LogRequest) -> Result<LineStream, ClientError> {
        let mut st = self.state.lock();
        let id = &request.identity;
        *st.opens.entry(id.clone()).or_insert(0) += 1;

        match st.open_faults.get(id).copied() {
            Some(OpenFault::Always) => {
                return Err(ClientError::Request(format!("cannot open output of {id}")));
            }
            Some(OpenFault::Times(n)) => {
                if n <= 1 {
                    st.open_faults.remove(id);
                } else {
                    st.open_faults.insert(id.clone(), OpenFault::Times(n - 1));
                }
                return Err(ClientError::Request(format!("cannot open output of {id}")));
            }
            None => {}
        }

        let buf = st.logs.entry(id.clone()).or_insert_with(LogBuffer::new);
        let backlog: Vec<Result<String, ClientError>> = buf
            .backlog
            .iter()
            .filter(|(at, _)| *at > request.since)
            .map(|(_, line)| Ok(line.to_string()))
            .collect();
        let replay = stream::iter(backlog);

        if request.follow {
            Ok(replay.chain(follow(buf.tx.subscribe())).boxed())
        } else {
            Ok(replay.boxed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id() -> StreamIdentity {
        StreamIdentity::new("ns", "pod", "c")
    }

    #[tokio::test]
    async fn test_backlog_respects_since() {
        let cluster = MemoryCluster::new();
        cluster.push_line(&id(), "old");
        tokio::time::sleep(Duration::from_millis(5)).await;
        let cut = SystemTime::now();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cluster.push_line(&id(), "new");

        let req = LogRequest {
            identity: id(),
            since: cut,
            follow: false,
        };
        let got: Vec<_> = cluster
            .open_logs(&req)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(got, vec![Ok("new".to_string())]);
    }

    #[tokio::test]
    async fn test_follow_receives_live_lines_until_close() {
        let cluster = MemoryCluster::new();
        let req = LogRequest {
            identity: id(),
            since: SystemTime::now(),
            follow: true,
        };
        let mut s = cluster.open_logs(&req).await.unwrap();
        cluster.push_line(&id(), "live");
        cluster.close_logs(&id());

        assert_eq!(s.next().await, Some(Ok("live".to_string())));
        assert_eq!(s.next().await, None);
    }

    #[tokio::test]
    async fn test_open_faults_count_down() {
        let cluster = MemoryCluster::new();
        cluster.fail_opens(&id(), OpenFault::Times(2));
        let req = LogRequest {
            identity: id(),
            since: SystemTime::now(),
            follow: false,
        };
        assert!(cluster.open_logs(&req).await.is_err());
        assert!(cluster.open_logs(&req).await.is_err());
        assert!(cluster.open_logs(&req).await.is_ok());
        assert_eq!(cluster.open_count(&id()), 3);
    }

    #[tokio::test]
    async fn test_workload_watch_sees_updates() {
        let cluster = MemoryCluster::new();
        let mut events = cluster
            .watch_workloads("ns")
            .await
            .unwrap();
        cluster.put_workload("ns", Workload::new("pod", Phase::Pending, ["c"]));
        assert!(cluster.set_phase("ns", "pod", Phase::Running));
        assert!(cluster.remove_workload("ns", "pod"));

        assert!(matches!(events.next().await, Some(Ok(WorkloadEvent::Added(_)))));
        match events.next().await {
            Some(Ok(WorkloadEvent::Updated { old, new })) => {
                assert_eq!(old.map(|w| w.phase), Some(Phase::Pending));
                assert_eq!(new.phase, Phase::Running);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(events.next().await, Some(Ok(WorkloadEvent::Removed(_)))));
    }

    #[tokio::test]
    async fn test_closed_partition_watch_ends_stream() {
        let cluster = MemoryCluster::new();
        let mut events = cluster
            .watch_partitions()
            .await
            .unwrap();
        cluster.close_partition_watch();
        assert!(events.next().await.is_none());
    }
}
