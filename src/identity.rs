//! # Stream identity.
//!
//! [`StreamIdentity`] names one log task: the `(partition, workload, process)`
//! triple. It is the key of the supervisor's task table, the origin tag of every
//! line, and the source of the tee file path.
//!
//! Cloning is cheap (three `Arc<str>`).

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Unique key of one stream task.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamIdentity {
    partition: Arc<str>,
    workload: Arc<str>,
    process: Arc<str>,
}

impl StreamIdentity {
    /// Creates a new identity.
    pub fn new(
        partition: impl Into<Arc<str>>,
        workload: impl Into<Arc<str>>,
        process: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            partition: partition.into(),
            workload: workload.into(),
            process: process.into(),
        }
    }

    /// Partition (namespace) name.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Workload (pod) name.
    pub fn workload(&self) -> &str {
        &self.workload
    }

    /// Process (container) name.
    pub fn process(&self) -> &str {
        &self.process
    }

    /// True if this identity belongs to `partition`.
    pub fn in_partition(&self, partition: &str) -> bool {
        &*self.partition == partition
    }

    /// True if this identity belongs to `workload` inside `partition`.
    pub fn in_workload(&self, partition: &str, workload: &str) -> bool {
        &*self.partition == partition && &*self.workload == workload
    }

    /// Derives `<root>/<partition>/<workload>/<process>.<ext>`.
    ///
    /// Returns `None` if any component could escape `root` (separators, `..`,
    /// empty names).
    pub fn file_path(&self, root: &Path, ext: &str) -> Option<PathBuf> {
        let parts = [&*self.partition, &*self.workload, &*self.process];
        if !parts.iter().all(|p| is_plain_component(p)) {
            return None;
        }
        let mut path = root.join(&*self.partition).join(&*self.workload);
        path.push(format!("{}.{ext}", self.process));
        Some(path)
    }
}

fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

impl fmt::Display for StreamIdentity {
    /// Renders as `partition/workload:process`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.partition, self.workload, self.process)
    }
}
