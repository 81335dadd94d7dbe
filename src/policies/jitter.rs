//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that many streams
//! losing their feed at the same moment (API server restart, node drain) do not
//! reconnect in lockstep.
//!
//! - [`JitterPolicy::None`] no randomization, predictable delays
//! - [`JitterPolicy::Proportional`] delay scaled by a uniform factor in `[1 - ratio, 1 + ratio]`

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of retry delays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JitterPolicy {
    /// No jitter: use exact backoff delay.
    ///
    /// Use when predictable timing is required (tests, single stream).
    None,

    /// Symmetric proportional jitter: `delay × uniform(1 - ratio, 1 + ratio)`.
    ///
    /// `ratio` is clamped to `[0.0, 1.0]`; `0.1` gives ±10%.
    Proportional {
        /// Maximum relative deviation.
        ratio: f64,
    },
}

impl Default for JitterPolicy {
    /// Returns ±10% proportional jitter.
    fn default() -> Self {
        JitterPolicy::Proportional { ratio: 0.1 }
    }
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match *self {
            JitterPolicy::None => delay,
            JitterPolicy::Proportional { ratio } => proportional(delay, ratio),
        }
    }

    /// Returns the `(min, max)` bounds that [`apply`](Self::apply) can produce.
    pub fn bounds(&self, delay: Duration) -> (Duration, Duration) {
        match *self {
            JitterPolicy::None => (delay, delay),
            JitterPolicy::Proportional { ratio } => {
                let r = clamp_ratio(ratio);
                (delay.mul_f64(1.0 - r), delay.mul_f64(1.0 + r))
            }
        }
    }
}

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 }
}

fn proportional(delay: Duration, ratio: f64) -> Duration {
    let r = clamp_ratio(ratio);
    if r == 0.0 || delay.is_zero() {
        return delay;
    }
    let mut rng = rand::rng();
    let scale = rng.random_range((1.0 - r)..=(1.0 + r));
    delay.mul_f64(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        let d = Duration::from_millis(250);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn test_proportional_stays_within_bounds() {
        let policy = JitterPolicy::Proportional { ratio: 0.1 };
        let d = Duration::from_millis(1000);
        let (lo, hi) = policy.bounds(d);
        assert!(lo.abs_diff(Duration::from_millis(900)) < Duration::from_micros(1));
        assert!(hi.abs_diff(Duration::from_millis(1100)) < Duration::from_micros(1));
        for _ in 0..200 {
            let j = policy.apply(d);
            assert!(j >= lo && j <= hi, "{j:?} outside [{lo:?}, {hi:?}]");
        }
    }

    #[test]
    fn test_ratio_is_clamped() {
        let policy = JitterPolicy::Proportional { ratio: 5.0 };
        let d = Duration::from_millis(100);
        for _ in 0..50 {
            assert!(policy.apply(d) <= Duration::from_millis(200));
        }
        let nan = JitterPolicy::Proportional { ratio: f64::NAN };
        assert_eq!(nan.apply(d), d);
    }
}
