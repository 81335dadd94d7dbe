//! # LogWriter: tracing-backed event printer
//!
//! A subscriber that forwards incoming [`Event`]s to `tracing`, one record per
//! event, at a level matching its severity. Install any `tracing` subscriber
//! (e.g. `tracing-subscriber` with `EnvFilter`) to see the output.
//!
//! ## Levels
//! ```text
//! trace  log-line
//! debug  partition-added, partition-removed
//! info   stream-started, stream-stopped, file-created, file-closed, shutdown-*
//! warn   backoff, error (fetch, sink, discovery, panicked), grace-exceeded
//! error  error (retry exhausted)
//! ```

use crate::error::StreamError;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let id = e.identity.as_ref().map(ToString::to_string);
        let id = id.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::LogLine => {
                tracing::trace!(stream = id, line = e.line.as_deref().unwrap_or(""), "[log-line]");
            }
            EventKind::StreamStarted => {
                tracing::info!(stream = id, "[stream-started]");
            }
            EventKind::StreamStopped => {
                tracing::info!(stream = id, reason = ?e.reason, "[stream-stopped]");
            }
            EventKind::BackoffScheduled => {
                tracing::warn!(
                    stream = id,
                    delay_ms = ?e.delay_ms,
                    failures = ?e.attempt,
                    reason = ?e.reason,
                    "[backoff]"
                );
            }
            EventKind::FileCreated => {
                tracing::info!(stream = id, path = ?e.path, "[file-created]");
            }
            EventKind::FileClosed => {
                tracing::info!(stream = id, path = ?e.path, "[file-closed]");
            }
            EventKind::Error => match e.error.as_deref() {
                Some(err @ StreamError::RetryExhausted { .. }) => {
                    tracing::error!(stream = id, label = err.as_label(), "{err}");
                }
                Some(err) => {
                    tracing::warn!(stream = id, label = err.as_label(), "{err}");
                }
                None => tracing::warn!(stream = id, "[error]"),
            },
            EventKind::PartitionAdded => {
                tracing::debug!(partition = ?e.partition, "[partition-added]");
            }
            EventKind::PartitionRemoved => {
                tracing::debug!(partition = ?e.partition, "[partition-removed]");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(reason = ?e.reason, "[grace-exceeded]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
