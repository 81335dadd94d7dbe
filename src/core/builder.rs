use std::io::Write;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::cluster::{LogFeed, PartitionFeed, WorkloadFeed};
use crate::core::config::Config;
use crate::core::orchestrator::Orchestrator;
use crate::core::supervisor::StreamSupervisor;
use crate::error::RuntimeError;
use crate::sink::OutputSink;
use crate::subscribers::{Callbacks, Subscribe, SubscriberSet};

/// Builder for an [`Orchestrator`].
///
/// Workload and log feeds are required; the partition feed is only needed for
/// selectors that are not a plain list of names.
pub struct OrchestratorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    partition_feed: Option<Arc<dyn PartitionFeed>>,
    workload_feed: Option<Arc<dyn WorkloadFeed>>,
    log_feed: Option<Arc<dyn LogFeed>>,
    console: Option<Box<dyn Write + Send>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            partition_feed: None,
            workload_feed: None,
            log_feed: None,
            console: None,
        }
    }

    /// Replaces the event subscribers.
    ///
    /// Subscribers are called synchronously from the publishing task, in order.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Appends a set of lifecycle callbacks.
    pub fn with_callbacks(self, callbacks: Callbacks) -> Self {
        self.with_subscriber(Arc::new(callbacks))
    }

    pub fn with_partition_feed(mut self, feed: Arc<dyn PartitionFeed>) -> Self {
        self.partition_feed = Some(feed);
        self
    }

    pub fn with_workload_feed(mut self, feed: Arc<dyn WorkloadFeed>) -> Self {
        self.workload_feed = Some(feed);
        self
    }

    pub fn with_log_feed(mut self, feed: Arc<dyn LogFeed>) -> Self {
        self.log_feed = Some(feed);
        self
    }

    /// Uses one client for all three feeds.
    pub fn with_cluster<C>(self, cluster: Arc<C>) -> Self
    where
        C: PartitionFeed + WorkloadFeed + LogFeed,
    {
        self.with_partition_feed(cluster.clone())
            .with_workload_feed(cluster.clone())
            .with_log_feed(cluster)
    }

    /// Prints lines to `console` instead of stdout.
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = Some(console);
        self
    }

    /// Builds the orchestrator. Nothing runs until
    /// [`Orchestrator::start_streaming`] is called.
    ///
    /// # Errors
    /// [`RuntimeError::MissingFeed`] if the workload or log feed is not set.
    pub fn build(self) -> Result<Arc<Orchestrator>, RuntimeError> {
        let workload_feed = self
            .workload_feed
            .ok_or(RuntimeError::MissingFeed { feed: "workload" })?;
        let log_feed = self
            .log_feed
            .ok_or(RuntimeError::MissingFeed { feed: "log" })?;

        let subs = SubscriberSet::new(self.subscribers);
        let runtime_token = CancellationToken::new();

        let semaphore = self
            .cfg
            .concurrency_limit()
            .map(Semaphore::new)
            .map(Arc::new);

        let sink = match self.console {
            Some(console) => OutputSink::with_console(self.cfg.output.clone(), console, subs.clone()),
            None => OutputSink::new(self.cfg.output.clone(), subs.clone()),
        };

        let supervisor = StreamSupervisor::new(
            log_feed,
            sink,
            subs.clone(),
            self.cfg.backoff,
            semaphore,
            runtime_token.child_token(),
        );

        Ok(Arc::new(Orchestrator::new_internal(
            self.cfg,
            subs,
            self.partition_feed,
            workload_feed,
            supervisor,
            runtime_token,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemoryCluster;

    #[test]
    fn test_missing_feeds_are_reported() {
        let cluster = Arc::new(MemoryCluster::new());

        let res = OrchestratorBuilder::new(Config::default()).build();
        assert!(matches!(res, Err(RuntimeError::MissingFeed { feed: "workload" })));

        let res = OrchestratorBuilder::new(Config::default())
            .with_workload_feed(cluster.clone())
            .build();
        assert!(matches!(res, Err(RuntimeError::MissingFeed { feed: "log" })));

        let res = OrchestratorBuilder::new(Config::default())
            .with_workload_feed(cluster.clone())
            .with_log_feed(cluster)
            .build();
        assert!(res.is_ok());
    }
}
