//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the orchestrator runtime.
//!
//! Config is used in two ways:
//! 1. **Orchestrator creation**: `Orchestrator::builder(config)`
//! 2. **Per-stream defaults**: every stream task gets `since` and `backoff` from it
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no admission semaphore created)
//! - `grace = 0s` → do not wait for streams to stop

use std::time::Duration;

use crate::cluster::ClientConfig;
use crate::policies::BackoffPolicy;
use crate::sink::OutputDestination;

/// Global configuration for the orchestrator runtime.
///
/// Defines:
/// - **History window**: how far back a new stream starts reading
/// - **Output**: tee directory and console switch
/// - **Client settings**: passed through to the cluster client
/// - **Reconnects**: backoff and attempt bound per stream
/// - **Shutdown behavior**: grace period for graceful termination
/// - **Admission**: max simultaneous stream attempts
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// History window for newly started streams.
    ///
    /// A stream first opens its feed from `now - since`.
    pub since: Duration,

    /// Where output lines go.
    pub output: OutputDestination,

    /// Cluster client rate settings (opaque to the runtime).
    pub client: ClientConfig,

    /// Reconnect policy for every stream task.
    pub backoff: BackoffPolicy,

    /// Maximum time `stop_streaming` waits for every stream to release its resources.
    ///
    /// If exceeded, `stop_streaming` returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Maximum number of stream attempts running concurrently.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `n > 0` = at most `n` feeds are open at once; others wait their turn
    pub max_concurrent: usize,
}

impl Config {
    /// Returns the global concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` concurrent attempts
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `since = 60s`
    /// - `output = console only`
    /// - `client = { qps: 500, burst: 1000 }`
    /// - `backoff = 100ms × 2.0, 5 attempts, ±10% jitter`
    /// - `grace = 60s`
    /// - `max_concurrent = 0` (unlimited)
    fn default() -> Self {
        Self {
            since: Duration::from_secs(60),
            output: OutputDestination::default(),
            client: ClientConfig::default(),
            backoff: BackoffPolicy::default(),
            grace: Duration::from_secs(60),
            max_concurrent: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.since, Duration::from_secs(60));
        assert_eq!(cfg.grace, Duration::from_secs(60));
        assert_eq!(cfg.backoff.max_attempts, 5);
        assert_eq!(cfg.client.burst, 1000);
        assert!(cfg.output.tee_dir.is_none());
        assert!(cfg.concurrency_limit().is_none());
    }
}
