//! # Backoff policy for reconnecting streams.
//!
//! [`BackoffPolicy`] controls how reconnect delays grow after repeated failures
//! and how many consecutive failed attempts a stream may make before giving up.
//! It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap;
//! - [`BackoffPolicy::max_attempts`] the attempt bound.
//!
//! The delay after failure `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jitter is applied. The base is derived purely from `n`, so jitter output
//! never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use streamvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     max_attempts: 5,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102.4s → capped at max=10s
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Reconnect backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Initial delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap for retries.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Consecutive failed attempts allowed before the stream gives up (min 1).
    pub max_attempts: u32,
    /// Jitter policy to prevent thundering herd.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 100ms`, `factor = 2.0`, `max = 30s`;
    /// - `max_attempts = 5`;
    /// - `jitter = ±10%`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            max_attempts: 5,
            jitter: JitterPolicy::default(),
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay after the given failure number (0-indexed).
    ///
    /// # Notes
    /// - If `factor` is less than 1.0, delays decrease with higher attempts (not typical).
    /// - If `factor` equals 1.0, delay remains constant at `first` (up to `max`).
    /// - Overflow and non-finite results clamp to `max`.
    pub fn next(&self, failure: u32) -> Duration {
        self.jitter.apply(self.base(failure))
    }

    /// The un-jittered delay after the given failure number.
    pub fn base(&self, failure: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let clamped_exp = failure.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(clamped_exp);

        if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped_secs)
        }
    }

    /// Attempt bound, never below 1.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// True once `failures` consecutive failed attempts exhaust the policy.
    #[inline]
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn exact(first_ms: u64, max: Duration, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max,
            factor,
            max_attempts: 5,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn test_attempt_zero_returns_first() {
        let policy = exact(100, Duration::from_secs(30), 2.0);
        assert_eq!(policy.next(0), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let policy = exact(100, Duration::from_secs(30), 2.0);
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(2), Duration::from_millis(400));
        assert_eq!(policy.next(3), Duration::from_millis(800));
    }

    #[test]
    fn test_clamped_to_max() {
        let policy = exact(100, Duration::from_secs(1), 2.0);
        assert_eq!(policy.next(10), Duration::from_secs(1));
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_first_exceeds_max() {
        let policy = exact(10_000, Duration::from_secs(5), 2.0);
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_default_jittered_delays_never_decrease() {
        let policy = BackoffPolicy::default();
        for _ in 0..50 {
            let delays: Vec<Duration> = (0..policy.attempts() - 1).map(|n| policy.next(n)).collect();
            assert!(delays.windows(2).all(|w| w[0] <= w[1]), "{delays:?}");
            assert!(delays[0] >= Duration::from_millis(89));
            assert!(delays[0] <= Duration::from_millis(111));
        }
    }

    #[test]
    fn test_exhaustion_bound() {
        let policy = BackoffPolicy::default();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));

        let zero = BackoffPolicy { max_attempts: 0, ..policy };
        assert_eq!(zero.attempts(), 1);
        assert!(zero.is_exhausted(1));
    }
}
