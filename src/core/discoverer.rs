//! # Workload discoverer for one partition.
//!
//! Keeps the stream supervisor in sync with the running workloads of one
//! partition:
//!
//! ```text
//! watch_workloads(p) ──► list_workloads(p) ──► reconcile every listed workload
//!        │
//!        └─► Added(w) / Updated{new: w}  ──► reconcile(w)
//!            Removed(w)                  ──► stop every process of w
//!
//! reconcile(w):
//!   running     ──► start new processes, stop processes that disappeared
//!   not running ──► stop every process of w
//! ```
//!
//! ## Rules
//! - Subscribe first, then list: nothing between the two is missed, and the
//!   listing is fully applied before any watch event.
//! - Events already queued when the listing is applied are collapsed to the
//!   last one per workload; a workload added and removed in that gap is never started.
//! - Every operation is idempotent (re-delivered adds start nothing twice).
//! - A failed listing or a broken watch aborts this partition only.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::cluster::{Workload, WorkloadEvent, WorkloadFeed};
use crate::core::supervisor::StreamSupervisor;
use crate::error::{ClientError, StreamError};
use crate::identity::StreamIdentity;

pub(crate) struct Discoverer {
    partition: Arc<str>,
    feed: Arc<dyn WorkloadFeed>,
    supervisor: StreamSupervisor,
    since: Duration,
    /// Running workloads and the processes started for them.
    running: HashMap<Arc<str>, Vec<Arc<str>>>,
}

impl Discoverer {
    pub(crate) fn new(
        partition: Arc<str>,
        feed: Arc<dyn WorkloadFeed>,
        supervisor: StreamSupervisor,
        since: Duration,
    ) -> Self {
        Self {
            partition,
            feed,
            supervisor,
            since,
            running: HashMap::new(),
        }
    }

    /// Runs until cancelled (`Ok`) or until the feed fails (`Err`).
    pub(crate) async fn run(&mut self, token: &CancellationToken) -> Result<(), StreamError> {
        let watched = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            res = self.feed.watch_workloads(&self.partition) => res,
        };
        let mut events = watched.map_err(|e| self.discovery(e))?;

        let listed = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            res = self.feed.list_workloads(&self.partition) => res,
        };
        let listed = listed.map_err(|e| self.discovery(e))?;
        let known: HashSet<Arc<str>> = listed.iter().map(|w| w.name.clone()).collect();
        for workload in &listed {
            self.reconcile(workload).await;
        }

        // Events queued while listing are applied as their net effect per workload.
        let mut queued = Vec::new();
        while let Some(next) = events.next().now_or_never() {
            match next {
                Some(Ok(ev)) => queued.push(ev),
                Some(Err(e)) => return Err(self.discovery(e)),
                None => {
                    return Err(self.discovery(ClientError::Stream("workload watch closed".into())));
                }
            }
        }
        for ev in coalesce(queued, &known) {
            self.apply(ev).await;
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                ev = events.next() => ev,
            };
            match next {
                Some(Ok(ev)) => self.apply(ev).await,
                Some(Err(e)) => return Err(self.discovery(e)),
                None => {
                    return Err(self.discovery(ClientError::Stream("workload watch closed".into())));
                }
            }
        }
    }

    async fn apply(&mut self, event: WorkloadEvent) {
        match event {
            WorkloadEvent::Added(w) | WorkloadEvent::Updated { new: w, .. } => {
                self.reconcile(&w).await;
            }
            WorkloadEvent::Removed(w) => self.forget(&w.name).await,
        }
    }

    async fn reconcile(&mut self, workload: &Workload) {
        if !workload.is_running() {
            self.forget(&workload.name).await;
            return;
        }

        let previous = self
            .running
            .insert(workload.name.clone(), workload.processes.clone())
            .unwrap_or_default();
        for gone in previous.iter().filter(|p| !workload.processes.contains(*p)) {
            self.supervisor.stop(&self.identity(&workload.name, gone)).await;
        }
        for id in workload.identities(&self.partition) {
            self.supervisor.start(id, self.since).await;
        }
    }

    async fn forget(&mut self, workload: &str) {
        self.running.remove(workload);
        self.supervisor.stop_workload(&self.partition, workload).await;
    }

    fn identity(&self, workload: &Arc<str>, process: &Arc<str>) -> StreamIdentity {
        StreamIdentity::new(self.partition.clone(), workload.clone(), process.clone())
    }

    fn discovery(&self, source: ClientError) -> StreamError {
        StreamError::Discovery {
            scope: self.partition.to_string(),
            source,
        }
    }
}

fn workload_name(event: &WorkloadEvent) -> &Arc<str> {
    match event {
        WorkloadEvent::Added(w) | WorkloadEvent::Updated { new: w, .. } | WorkloadEvent::Removed(w) => {
            &w.name
        }
    }
}

/// Keeps the last event per workload, in queue order. Removals of workloads the
/// listing never returned are dropped.
fn coalesce(queued: Vec<WorkloadEvent>, listed: &HashSet<Arc<str>>) -> Vec<WorkloadEvent> {
    let mut last: HashMap<Arc<str>, usize> = HashMap::new();
    for (i, ev) in queued.iter().enumerate() {
        last.insert(workload_name(ev).clone(), i);
    }
    queued
        .into_iter()
        .enumerate()
        .filter(|(i, ev)| last.get(workload_name(ev)) == Some(i))
        .filter(|(_, ev)| {
            !matches!(ev, WorkloadEvent::Removed(w) if !listed.contains(&w.name))
        })
        .map(|(_, ev)| ev)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{LogFeed, MemoryCluster, Phase, WatchStream};
    use crate::events::EventKind;
    use crate::policies::BackoffPolicy;
    use crate::sink::{OutputDestination, OutputSink};
    use crate::testing::Recorder;
    use futures::stream;

    fn supervisor(logs: Arc<dyn LogFeed>, rec: &Recorder) -> StreamSupervisor {
        let subs = rec.set();
        StreamSupervisor::new(
            logs,
            OutputSink::new(OutputDestination::console().with_silent(true), subs.clone()),
            subs,
            BackoffPolicy::default(),
            None,
            CancellationToken::new(),
        )
    }

    fn spawn(
        partition: &str,
        feed: Arc<dyn WorkloadFeed>,
        sup: &StreamSupervisor,
        token: &CancellationToken,
    ) -> tokio::task::JoinHandle<Result<(), StreamError>> {
        let mut d = Discoverer::new(partition.into(), feed, sup.clone(), Duration::from_secs(60));
        let t = token.clone();
        tokio::spawn(async move { d.run(&t).await })
    }

    async fn tracked(sup: &StreamSupervisor) -> Vec<String> {
        sup.list().await.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_update_adding_a_process_starts_only_the_new_one() {
        let cluster = Arc::new(MemoryCluster::new());
        cluster.put_workload("ns", Workload::new("web", Phase::Running, ["app"]));
        let rec = Recorder::new();
        let sup = supervisor(cluster.clone(), &rec);
        let token = CancellationToken::new();
        let handle = spawn("ns", cluster.clone(), &sup, &token);

        assert!(rec.wait_for(EventKind::StreamStarted, 1).await);
        cluster.put_workload("ns", Workload::new("web", Phase::Running, ["app", "proxy"]));
        assert!(rec.wait_for(EventKind::StreamStarted, 2).await);

        assert_eq!(tracked(&sup).await, vec!["ns/web:app", "ns/web:proxy"]);
        assert_eq!(rec.count(EventKind::StreamStarted), 2);
        assert_eq!(rec.count(EventKind::StreamStopped), 0);
        let app = StreamIdentity::new("ns", "web", "app");
        assert_eq!(cluster.open_count(&app), 1);

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
        sup.stop_all().await;
    }

    /// Workload feed whose watch already holds events queued before the listing.
    struct QueuedFeed {
        listed: Vec<Workload>,
        queued: Vec<WorkloadEvent>,
    }

    #[async_trait::async_trait]
    impl WorkloadFeed for QueuedFeed {
        async fn list_workloads(&self, _partition: &str) -> Result<Vec<Workload>, ClientError> {
            Ok(self.listed.clone())
        }

        async fn watch_workloads(
            &self,
            _partition: &str,
        ) -> Result<WatchStream<WorkloadEvent>, ClientError> {
            let queued: Vec<Result<WorkloadEvent, ClientError>> =
                self.queued.iter().cloned().map(Ok).collect();
            Ok(stream::iter(queued).chain(stream::pending()).boxed())
        }
    }

    #[tokio::test]
    async fn test_workload_added_and_removed_before_listing_is_never_started() {
        let cluster = Arc::new(MemoryCluster::new());
        let ghost = Workload::new("ghost", Phase::Running, ["c"]);
        let late = Workload::new("late", Phase::Running, ["c"]);
        let feed = Arc::new(QueuedFeed {
            listed: vec![Workload::new("web", Phase::Running, ["app"])],
            queued: vec![
                WorkloadEvent::Added(ghost.clone()),
                WorkloadEvent::Added(late),
                WorkloadEvent::Removed(ghost),
            ],
        });
        let rec = Recorder::new();
        let sup = supervisor(cluster.clone(), &rec);
        let token = CancellationToken::new();
        let handle = spawn("ns", feed, &sup, &token);

        assert!(rec.wait_for(EventKind::StreamStarted, 2).await);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(tracked(&sup).await, vec!["ns/late:c", "ns/web:app"]);
        assert_eq!(rec.count(EventKind::StreamStarted), 2);
        assert_eq!(cluster.open_count(&StreamIdentity::new("ns", "ghost", "c")), 0);

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
        sup.stop_all().await;
    }
}
