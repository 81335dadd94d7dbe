//! # Runtime events emitted by the orchestrator, stream actors and writers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Stream lifecycle**: a task started or stopped, a reconnect was scheduled
//! - **Output**: a line was produced, a tee file was created or closed
//! - **Scope**: a partition entered or left scope
//! - **Shutdown**: shutdown requested, finished within grace or not
//!
//! The [`Event`] struct carries the optional metadata (identity, line, path, error...).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events of one identity are emitted from that identity's task, in order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use streamvisor::{Event, EventKind, StreamIdentity};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_identity(StreamIdentity::new("default", "web-0", "nginx"))
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(200));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay_ms, Some(200));
//! ```

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::error::StreamError;
use crate::identity::StreamIdentity;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Stream lifecycle ===
    /// A stream task was created for an identity (once per task, not per attempt).
    ///
    /// Sets:
    /// - `identity`
    StreamStarted,

    /// A stream task ended and released its resources.
    ///
    /// Sets:
    /// - `identity`
    /// - `reason`: `cancelled`, `exhausted` or `panicked`
    StreamStopped,

    /// An attempt ended and the next one is scheduled.
    ///
    /// Sets:
    /// - `identity`
    /// - `attempt`: consecutive failed attempts so far (0 after a productive attempt)
    /// - `delay_ms`: delay before the next attempt
    /// - `reason`: why the attempt ended
    BackoffScheduled,

    // === Output ===
    /// One line of process output.
    ///
    /// Sets:
    /// - `identity`
    /// - `line`: text without the trailing newline
    LogLine,

    /// A tee file was created (first line of the identity).
    ///
    /// Sets:
    /// - `identity`
    /// - `path`
    FileCreated,

    /// A tee file was flushed and closed.
    ///
    /// Sets:
    /// - `identity`
    /// - `path`
    FileClosed,

    /// A contained failure.
    ///
    /// Sets:
    /// - `error`
    /// - `identity` for task-scoped errors, `partition` for discovery errors
    Error,

    // === Scope ===
    /// A partition entered scope and its discovery started.
    ///
    /// Sets:
    /// - `partition`
    PartitionAdded,

    /// A partition left scope and its discovery stopped.
    ///
    /// Sets:
    /// - `partition`
    PartitionRemoved,

    // === Shutdown ===
    /// Shutdown requested (explicit stop or OS signal).
    ShutdownRequested,

    /// All streams stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some streams did not stop in time.
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Stream identity, if applicable.
    pub identity: Option<StreamIdentity>,
    /// Partition name for scope events.
    pub partition: Option<Arc<str>>,
    /// Output line.
    pub line: Option<Arc<str>>,
    /// Tee file path.
    pub path: Option<Arc<Path>>,
    /// Contained error.
    pub error: Option<Arc<StreamError>>,
    /// Attempt count.
    pub attempt: Option<u32>,
    /// Backoff delay before next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            identity: None,
            partition: None,
            line: None,
            path: None,
            error: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a stream identity.
    #[inline]
    pub fn with_identity(mut self, identity: StreamIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Attaches a partition name.
    #[inline]
    pub fn with_partition(mut self, partition: impl Into<Arc<str>>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Attaches an output line.
    #[inline]
    pub fn with_line(mut self, line: impl Into<Arc<str>>) -> Self {
        self.line = Some(line.into());
        self
    }

    /// Attaches a file path.
    #[inline]
    pub fn with_path(mut self, path: impl Into<Arc<Path>>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attaches an error; also copies its identity if it has one.
    #[inline]
    pub fn with_error(mut self, error: Arc<StreamError>) -> Self {
        if self.identity.is_none() {
            self.identity = error.identity().cloned();
        }
        self.error = Some(error);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Shorthand for an [`EventKind::Error`] event.
    pub fn error(error: StreamError) -> Self {
        Event::new(EventKind::Error).with_error(error.into_shared())
    }
}
