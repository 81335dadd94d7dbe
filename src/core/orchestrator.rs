//! # Orchestrator: selector in, supervised streams out.
//!
//! The [`Orchestrator`] wires the partition watcher, the partition set and the
//! stream supervisor together and owns the runtime cancellation token.
//!
//! ## High-level architecture
//! ```text
//! start_streaming(selector, since)
//!   ├─ static selector (literals only) ──► PartitionSet::add(p) for each literal
//!   └─ otherwise ──► PartitionWatcher::handshake() ──► follow() until feed lost / cancel
//!                          │
//!                          ▼
//!                    PartitionSet ── one Discoverer per partition
//!                          │
//!                          ▼
//!                    StreamSupervisor ── one StreamActor per identity ──► OutputSink
//!   then wait until: runtime token cancelled  OR  no partition is served
//!
//! stop_streaming()
//!   └─► publish ShutdownRequested
//!   └─► runtime_token.cancel()   → refuses new partitions and streams
//!   └─► within cfg.grace: PartitionSet::stop_all(), StreamSupervisor::stop_all()
//!          ├─ Ok      → publish AllStoppedWithin
//!          └─ timeout → publish GraceExceeded, Err(RuntimeError::GraceExceeded)
//! ```
//!
//! ## Rules
//! - `start_streaming` runs at most once per orchestrator.
//! - `stop_streaming` is idempotent; concurrent callers wait for the first one.
//! - Several orchestrators may coexist; nothing is process-global.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cluster::{PartitionFeed, WorkloadFeed};
use crate::core::builder::OrchestratorBuilder;
use crate::core::config::Config;
use crate::core::partitions::PartitionSet;
use crate::core::shutdown;
use crate::core::supervisor::StreamSupervisor;
use crate::core::watcher::PartitionWatcher;
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::selector::Selector;
use crate::subscribers::SubscriberSet;

/// Stream-lifecycle orchestrator.
pub struct Orchestrator {
    cfg: Config,
    subs: SubscriberSet,
    partition_feed: Option<Arc<dyn PartitionFeed>>,
    workload_feed: Arc<dyn WorkloadFeed>,
    supervisor: StreamSupervisor,
    partitions: OnceLock<PartitionSet>,
    runtime: CancellationToken,
    stopping: AtomicBool,
    /// Fired once the shutdown drain has finished, whoever started it.
    drained: CancellationToken,
    /// Identities still running when the grace period ran out.
    stuck: Arc<Mutex<Option<Vec<String>>>>,
}

impl Orchestrator {
    /// Returns a builder for an orchestrator with the given configuration.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        subs: SubscriberSet,
        partition_feed: Option<Arc<dyn PartitionFeed>>,
        workload_feed: Arc<dyn WorkloadFeed>,
        supervisor: StreamSupervisor,
        runtime: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            subs,
            partition_feed,
            workload_feed,
            supervisor,
            partitions: OnceLock::new(),
            runtime,
            stopping: AtomicBool::new(false),
            drained: CancellationToken::new(),
            stuck: Arc::new(Mutex::new(None)),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The stream supervisor (for direct start/stop and inspection).
    pub fn supervisor(&self) -> &StreamSupervisor {
        &self.supervisor
    }

    /// Partitions currently served, sorted.
    pub async fn partitions(&self) -> Vec<String> {
        match self.partitions.get() {
            Some(set) => set.list().await.iter().map(ToString::to_string).collect(),
            None => Vec::new(),
        }
    }

    /// True once shutdown has begun.
    pub fn is_stopping(&self) -> bool {
        self.runtime.is_cancelled()
    }

    /// Streams every partition the selector resolves, starting each new stream
    /// from `now - since`.
    ///
    /// Blocks until the orchestrator is stopped or no partition is left to
    /// serve, then releases everything (bounded by `Config::grace`).
    ///
    /// # Errors
    /// - [`RuntimeError::AlreadyStarted`] on a second call;
    /// - [`RuntimeError::MissingFeed`] if a dynamic selector has no partition feed;
    /// - [`RuntimeError::Handshake`] if the initial partition watch or listing fails;
    /// - [`RuntimeError::GraceExceeded`] if the final shutdown timed out.
    pub async fn start_streaming(
        &self,
        selector: Selector,
        since: Duration,
    ) -> Result<(), RuntimeError> {
        let partitions = PartitionSet::new(
            self.workload_feed.clone(),
            self.supervisor.clone(),
            self.subs.clone(),
            since,
            self.runtime.clone(),
        );
        if self.partitions.set(partitions.clone()).is_err() {
            return Err(RuntimeError::AlreadyStarted);
        }

        match self.serve(&partitions, selector).await {
            Ok(()) => {
                let reason = if self.runtime.is_cancelled() {
                    "requested"
                } else {
                    "exhausted"
                };
                self.shutdown(reason).await
            }
            Err(err) => {
                if let Err(stop_err) = self.shutdown("startup failed").await {
                    tracing::warn!(error = %stop_err, "shutdown after failed start");
                }
                Err(err)
            }
        }
    }

    /// Stops every stream and discoverer and waits for their resources to be
    /// released, at most `Config::grace`. Idempotent.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] with the identities still running.
    pub async fn stop_streaming(&self) -> Result<(), RuntimeError> {
        self.shutdown("requested").await
    }

    /// Like [`start_streaming`](Self::start_streaming) with `Config::since`, but
    /// also shuts down gracefully on SIGINT, SIGTERM, SIGQUIT or Ctrl-C.
    pub async fn run(&self, selector: Selector) -> Result<(), RuntimeError> {
        let signal = async {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(sig) => sig,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for termination signals");
                    std::future::pending().await
                }
            }
        };
        tokio::select! {
            res = self.start_streaming(selector, self.cfg.since) => res,
            sig = signal => {
                tracing::info!(signal = %sig, "termination signal received");
                self.shutdown(sig.as_str()).await
            }
        }
    }

    async fn serve(&self, partitions: &PartitionSet, selector: Selector) -> Result<(), RuntimeError> {
        match selector.static_names() {
            Some(names) => {
                for name in names {
                    partitions.add(name.into()).await;
                }
            }
            None => {
                let feed = self
                    .partition_feed
                    .clone()
                    .ok_or(RuntimeError::MissingFeed { feed: "partition" })?;
                let watcher =
                    PartitionWatcher::new(feed, selector, partitions.clone(), self.subs.clone());
                let events = tokio::select! {
                    biased;
                    _ = self.runtime.cancelled() => return Ok(()),
                    res = watcher.handshake() => res?,
                };
                watcher.follow(events, &self.runtime).await;
            }
        }

        tokio::select! {
            _ = self.runtime.cancelled() => {}
            _ = partitions.wait_empty() => {}
        }
        Ok(())
    }

    /// Starts the drain once and waits for it. Every caller gets the same outcome,
    /// even if the caller that started the drain was dropped.
    async fn shutdown(&self, reason: &str) -> Result<(), RuntimeError> {
        if !self.stopping.swap(true, Ordering::SeqCst) {
            self.subs
                .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
            self.runtime.cancel();
            tokio::spawn(drain(
                self.partitions.get().cloned(),
                self.supervisor.clone(),
                self.subs.clone(),
                self.cfg.grace,
                self.stuck.clone(),
                self.drained.clone(),
            ));
        }

        self.drained.cancelled().await;
        match self.stuck.lock().clone() {
            None => Ok(()),
            Some(stuck) => Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            }),
        }
    }
}

async fn drain(
    partitions: Option<PartitionSet>,
    supervisor: StreamSupervisor,
    subs: SubscriberSet,
    grace: Duration,
    stuck: Arc<Mutex<Option<Vec<String>>>>,
    drained: CancellationToken,
) {
    let _done = drained.drop_guard();
    let stop = async {
        if let Some(set) = &partitions {
            set.stop_all().await;
        }
        supervisor.stop_all().await;
    };

    match tokio::time::timeout(grace, stop).await {
        Ok(()) => subs.publish(Event::new(EventKind::AllStoppedWithin)),
        Err(_) => {
            let mut names: Vec<String> = match &partitions {
                Some(set) => set.list().await.iter().map(ToString::to_string).collect(),
                None => Vec::new(),
            };
            names.extend(supervisor.list().await.iter().map(ToString::to_string));
            subs.publish(Event::new(EventKind::GraceExceeded).with_reason(names.join(", ")));
            *stuck.lock() = Some(names);
        }
    }
}
