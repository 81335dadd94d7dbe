//! Error types used by the streamvisor runtime, its feeds and its sinks.
//!
//! This module defines the error enums of the crate:
//!
//! - [`PatternError`] bad selector input, raised at construction (fatal to startup).
//! - [`ClientError`] failures reported by an external cluster client (feeds).
//! - [`StreamError`] contained, per-task or per-partition failures delivered to subscribers.
//! - [`DestinationError`] tee directory preparation failures.
//! - [`RuntimeError`] errors raised by the orchestrator itself.
//!
//! All of them provide `as_label` for logging/metrics keys.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::identity::StreamIdentity;

/// # Invalid selector input.
///
/// Raised while compiling a [`NamePattern`](crate::NamePattern); a constructed
/// pattern is always valid so matching never fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern is empty or is not a well-formed glob.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The pattern text as given.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl PatternError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use streamvisor::NamePattern;
    ///
    /// let err = NamePattern::compile("").unwrap_err();
    /// assert_eq!(err.as_label(), "pattern_invalid");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PatternError::InvalidPattern { .. } => "pattern_invalid",
        }
    }
}

/// # Errors produced by an external cluster client.
///
/// Feed implementations ([`PartitionFeed`](crate::PartitionFeed),
/// [`WorkloadFeed`](crate::WorkloadFeed), [`LogFeed`](crate::LogFeed)) return these.
/// The runtime wraps them with identity context before reporting.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A request (list, watch or open) was rejected or could not be sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An established stream broke while reading.
    #[error("stream interrupted: {0}")]
    Stream(String),
}

impl ClientError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClientError::Request(_) => "client_request",
            ClientError::NotFound(_) => "client_not_found",
            ClientError::Stream(_) => "client_stream",
        }
    }
}

/// # Contained runtime failures.
///
/// None of these stop the orchestrator: they are delivered to subscribers as
/// [`EventKind::Error`](crate::EventKind::Error) events and the affected task or
/// partition handles them locally.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StreamError {
    /// Listing or watching a scope failed; that partition's discovery aborts.
    #[error("discovery failed for {scope}: {source}")]
    Discovery {
        /// Partition name, or `"partitions"` for the partition feed itself.
        scope: String,
        /// Underlying client failure.
        source: ClientError,
    },

    /// Opening or reading a process output feed failed (retried).
    #[error("fetch failed for {identity} (attempt {attempt}): {source}")]
    Fetch {
        /// Task identity.
        identity: StreamIdentity,
        /// Attempt number (1-based).
        attempt: u32,
        /// Underlying client failure.
        source: ClientError,
    },

    /// The task gave up after its bounded retries.
    #[error("giving up on {identity} after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Task identity.
        identity: StreamIdentity,
        /// Number of attempts performed.
        attempts: u32,
        /// Description of the last failure.
        last: String,
    },

    /// Creating or writing a tee file failed; tee is suppressed for the identity.
    #[error("tee failed for {identity} at {}: {source}", path.display())]
    Sink {
        /// Task identity.
        identity: StreamIdentity,
        /// File path involved.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// A stream task or discoverer panicked; the panic was contained.
    #[error("{scope} panicked: {info}")]
    Panicked {
        /// Identity or partition that panicked.
        scope: String,
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl StreamError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::Discovery { .. } => "stream_discovery",
            StreamError::Fetch { .. } => "stream_fetch",
            StreamError::RetryExhausted { .. } => "stream_retry_exhausted",
            StreamError::Sink { .. } => "stream_sink",
            StreamError::Panicked { .. } => "stream_panicked",
        }
    }

    /// Returns the identity the error refers to, if it is task-scoped.
    pub fn identity(&self) -> Option<&StreamIdentity> {
        match self {
            StreamError::Fetch { identity, .. }
            | StreamError::RetryExhausted { identity, .. }
            | StreamError::Sink { identity, .. } => Some(identity),
            StreamError::Discovery { .. } | StreamError::Panicked { .. } => None,
        }
    }

    pub(crate) fn into_shared(self) -> Arc<StreamError> {
        Arc::new(self)
    }
}

/// # Tee directory preparation failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DestinationError {
    /// The directory exists and reuse was not allowed.
    #[error("directory {} already exists", path.display())]
    Exists {
        /// Offending path.
        path: PathBuf,
    },

    /// The directory could not be inspected or created.
    #[error("cannot prepare {}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}

impl DestinationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DestinationError::Exists { .. } => "destination_exists",
            DestinationError::Io { .. } => "destination_io",
        }
    }
}

/// # Errors produced by the orchestrator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The initial partition watch or listing failed.
    #[error("initial handshake with the partition feed failed: {source}")]
    Handshake {
        /// Underlying client failure.
        source: ClientError,
    },

    /// The builder was not given a feed that the requested mode needs.
    #[error("no {feed} feed configured")]
    MissingFeed {
        /// Which feed is missing (`"partition"`, `"workload"`, `"log"`).
        feed: &'static str,
    },

    /// `start_streaming` was called more than once.
    #[error("streaming already started")]
    AlreadyStarted,

    /// Shutdown grace period was exceeded; some streams did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Identities (rendered) that did not shut down in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use streamvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Handshake { .. } => "runtime_handshake",
            RuntimeError::MissingFeed { .. } => "runtime_missing_feed",
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_identity_context() {
        let id = StreamIdentity::new("prod", "api-7f9", "sidecar");
        let err = StreamError::RetryExhausted {
            identity: id.clone(),
            attempts: 5,
            last: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("prod/api-7f9:sidecar"), "{msg}");
        assert!(msg.contains("5 attempts"));
        assert_eq!(err.identity(), Some(&id));
        assert_eq!(err.as_label(), "stream_retry_exhausted");
    }

    #[test]
    fn test_discovery_error_names_scope() {
        let err = StreamError::Discovery {
            scope: "payments".into(),
            source: ClientError::Request("forbidden".into()),
        };
        assert!(err.to_string().contains("payments"));
        assert!(err.identity().is_none());
    }

    #[test]
    fn test_pattern_error_names_pattern() {
        let err = PatternError::InvalidPattern {
            pattern: "[invalid".into(),
            reason: "unterminated character class".into(),
        };
        assert!(err.to_string().contains("\"[invalid\""));
    }
}
