//! Shared data types exchanged with cluster feeds.

use std::sync::Arc;
use std::time::SystemTime;

use crate::identity::StreamIdentity;

/// Workload lifecycle phase as reported by the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Accepted but not all processes are running yet.
    Pending,
    /// Bound to a host and its processes have been started.
    Running,
    /// All processes exited successfully.
    Succeeded,
    /// All processes exited and at least one failed.
    Failed,
    /// The phase could not be obtained.
    Unknown,
}

impl Phase {
    /// True for the only phase that has live output.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Phase::Running)
    }
}

/// One workload snapshot: name, phase and the names of its processes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workload {
    /// Workload name, unique within its partition.
    pub name: Arc<str>,
    /// Current phase.
    pub phase: Phase,
    /// Process names, in declaration order.
    pub processes: Vec<Arc<str>>,
}

impl Workload {
    /// Creates a workload snapshot.
    pub fn new<I, S>(name: impl Into<Arc<str>>, phase: Phase, processes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            name: name.into(),
            phase,
            processes: processes.into_iter().map(Into::into).collect(),
        }
    }

    /// True if the workload is running.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    /// Identities of every process of this workload inside `partition`.
    pub fn identities<'a>(
        &'a self,
        partition: &'a str,
    ) -> impl Iterator<Item = StreamIdentity> + 'a {
        self.processes
            .iter()
            .map(move |p| StreamIdentity::new(partition, self.name.clone(), p.clone()))
    }
}

/// Partition membership change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionEvent {
    /// A partition was created (or re-delivered).
    Added(Arc<str>),
    /// A partition was deleted.
    Removed(Arc<str>),
}

/// Workload lifecycle change inside one partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkloadEvent {
    /// A workload appeared.
    Added(Workload),
    /// A workload changed: `old` is the previously known snapshot, when there is one.
    Updated {
        /// Previous snapshot.
        old: Option<Workload>,
        /// Current snapshot.
        new: Workload,
    },
    /// A workload was deleted.
    Removed(Workload),
}

/// Parameters of one output fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRequest {
    /// Which process to read.
    pub identity: StreamIdentity,
    /// Only lines produced strictly after this instant.
    pub since: SystemTime,
    /// Keep the stream open and deliver new lines as they are produced.
    pub follow: bool,
}

/// Client settings passed through opaquely to the cluster client.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClientConfig {
    /// Sustained requests per second.
    pub qps: f32,
    /// Burst allowance.
    pub burst: u32,
}

impl Default for ClientConfig {
    /// `qps = 500`, `burst = 1000`.
    fn default() -> Self {
        Self {
            qps: 500.0,
            burst: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_running_is_running() {
        for phase in [Phase::Pending, Phase::Succeeded, Phase::Failed, Phase::Unknown] {
            assert!(!phase.is_running());
        }
        assert!(Phase::Running.is_running());
    }

    #[test]
    fn test_identities_cover_every_process() {
        let w = Workload::new("web-0", Phase::Running, ["nginx", "sidecar"]);
        let ids: Vec<String> = w.identities("default").map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["default/web-0:nginx", "default/web-0:sidecar"]);
    }
}
