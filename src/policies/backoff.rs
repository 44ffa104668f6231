//! # Backoff policy for retry scheduling.
//!
//! [`BackoffPolicy`] maps a zero-based attempt index to a [`BackoffDecision`]:
//! either wait some duration before the next attempt, or give up.
//!
//! Two delay shapes are supported:
//! - **fixed** — the same delay before every retry;
//! - **exponential** — `first × factor^attempt`, clamped to `max`.
//!
//! Both can be capped with [`BackoffPolicy::with_max_attempts`]; without a cap
//! the policy never gives up. The delay for attempt `n` is derived purely from
//! `n`, so jitter output never feeds back into subsequent calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use poolvisor::{BackoffDecision, BackoffPolicy};
//!
//! let backoff = BackoffPolicy::exponential(
//!     Duration::from_millis(100),
//!     Duration::from_secs(10),
//!     2.0,
//! )
//! .unwrap()
//! .with_max_attempts(3);
//!
//! // After attempt 0 fails: wait first × 2^0 = 100ms.
//! assert_eq!(backoff.decide(0), BackoffDecision::Wait(Duration::from_millis(100)));
//!
//! // After attempt 1 fails: wait 200ms.
//! assert_eq!(backoff.decide(1), BackoffDecision::Wait(Duration::from_millis(200)));
//!
//! // Attempt 2 was the third and last permitted attempt.
//! assert_eq!(backoff.decide(2), BackoffDecision::GiveUp);
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::jitter::JitterPolicy;

/// Per-attempt scheduling decision produced by [`BackoffPolicy::decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Schedule the next attempt after this delay.
    Wait(Duration),
    /// Stop retrying; the last attempt's error becomes terminal.
    GiveUp,
}

/// Delay curve used by a [`BackoffPolicy`].
#[derive(Clone, Copy, Debug)]
pub enum BackoffKind {
    /// The same delay before every retry.
    Fixed {
        /// Delay between attempts.
        delay: Duration,
    },
    /// `first × factor^attempt`, clamped to `max`.
    Exponential {
        /// Delay before the first retry.
        first: Duration,
        /// Maximum delay cap.
        max: Duration,
        /// Multiplicative growth factor (`> 1`, enforced at construction).
        factor: f64,
    },
}

/// Retry backoff policy.
///
/// Pure and stateless: safe to copy into any number of concurrently running
/// retry tasks. Construct with [`BackoffPolicy::fixed`] or
/// [`BackoffPolicy::exponential`], then optionally cap total attempts and
/// attach jitter.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay curve.
    pub kind: BackoffKind,
    /// Maximum number of attempts in total (`None` = retry forever).
    pub max_attempts: Option<u32>,
    /// Jitter applied on top of the computed (clamped) delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a fixed 100ms delay with at most 10 attempts and no jitter.
    fn default() -> Self {
        BackoffPolicy::fixed(Duration::from_millis(100)).with_max_attempts(10)
    }
}

impl BackoffPolicy {
    /// Creates a fixed-delay policy with unlimited attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            kind: BackoffKind::Fixed { delay },
            max_attempts: None,
            jitter: JitterPolicy::None,
        }
    }

    /// Creates an exponential policy with unlimited attempts.
    ///
    /// Rejects `factor <= 1.0` (and NaN) as a configuration error: an
    /// exponential curve that does not grow is a misconfiguration, not a
    /// runtime condition to paper over.
    pub fn exponential(first: Duration, max: Duration, factor: f64) -> Result<Self, ConfigError> {
        if !(factor > 1.0) {
            return Err(ConfigError::FactorOutOfRange { factor });
        }
        Ok(Self {
            kind: BackoffKind::Exponential { first, max, factor },
            max_attempts: None,
            jitter: JitterPolicy::None,
        })
    }

    /// Caps the total number of attempts.
    ///
    /// `n` counts attempts, not retries: `with_max_attempts(1)` means the
    /// operation runs once and is never retried.
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Attaches a jitter policy.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Decides what to do after attempt `attempt` (zero-based) failed.
    ///
    /// Returns [`BackoffDecision::Wait`] with the delay before attempt
    /// `attempt + 1`, or [`BackoffDecision::GiveUp`] once the attempt cap is
    /// reached.
    ///
    /// # Notes
    /// - The exponent is computed from the attempt index alone; jitter output
    ///   never feeds back into later delays.
    /// - Arbitrarily large attempt indices are safe: the exponent is clamped
    ///   and any non-finite or over-cap product collapses to `max`.
    pub fn decide(&self, attempt: u32) -> BackoffDecision {
        if let Some(limit) = self.max_attempts {
            if attempt.saturating_add(1) >= limit {
                return BackoffDecision::GiveUp;
            }
        }
        BackoffDecision::Wait(self.jitter.apply(self.base_delay(attempt)))
    }

    /// Computes the pre-jitter delay for the given attempt index.
    fn base_delay(&self, attempt: u32) -> Duration {
        match self.kind {
            BackoffKind::Fixed { delay } => delay,
            BackoffKind::Exponential { first, max, factor } => {
                let clamped_exp = attempt.min(i32::MAX as u32) as i32;
                let unclamped_secs = first.as_secs_f64() * factor.powi(clamped_exp);
                let max_secs = max.as_secs_f64();

                if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs
                {
                    max
                } else {
                    Duration::from_secs_f64(unclamped_secs)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn exp(first_ms: u64, max_s: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy::exponential(
            Duration::from_millis(first_ms),
            Duration::from_secs(max_s),
            factor,
        )
        .unwrap()
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = BackoffPolicy::fixed(Duration::from_millis(500));
        for attempt in 0..10 {
            assert_eq!(
                policy.decide(attempt),
                BackoffDecision::Wait(Duration::from_millis(500)),
                "attempt {} should wait a constant 500ms",
                attempt
            );
        }
    }

    #[test]
    fn test_exponential_growth() {
        let policy = exp(100, 30, 2.0);
        assert_eq!(
            policy.decide(0),
            BackoffDecision::Wait(Duration::from_millis(100))
        );
        assert_eq!(
            policy.decide(1),
            BackoffDecision::Wait(Duration::from_millis(200))
        );
        assert_eq!(
            policy.decide(2),
            BackoffDecision::Wait(Duration::from_millis(400))
        );
        assert_eq!(
            policy.decide(3),
            BackoffDecision::Wait(Duration::from_millis(800))
        );
    }

    #[test]
    fn test_exponential_delays_non_decreasing_and_capped() {
        let policy = exp(100, 5, 2.0);
        let mut prev = Duration::ZERO;
        for attempt in 0..64 {
            match policy.decide(attempt) {
                BackoffDecision::Wait(d) => {
                    assert!(d >= prev, "attempt {}: {:?} < {:?}", attempt, d, prev);
                    assert!(d <= Duration::from_secs(5));
                    prev = d;
                }
                BackoffDecision::GiveUp => panic!("uncapped policy gave up"),
            }
        }
    }

    #[test]
    fn test_huge_attempt_clamps_to_max() {
        let policy = exp(100, 60, 2.0);
        assert_eq!(
            policy.decide(100),
            BackoffDecision::Wait(Duration::from_secs(60))
        );
        assert_eq!(
            policy.decide(u32::MAX),
            BackoffDecision::Wait(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_first_exceeds_max() {
        let policy = BackoffPolicy::exponential(
            Duration::from_secs(10),
            Duration::from_secs(5),
            2.0,
        )
        .unwrap();
        assert_eq!(
            policy.decide(0),
            BackoffDecision::Wait(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_factor_at_most_one_rejected() {
        let first = Duration::from_millis(100);
        let max = Duration::from_secs(1);
        assert!(BackoffPolicy::exponential(first, max, 1.0).is_err());
        assert!(BackoffPolicy::exponential(first, max, 0.5).is_err());
        assert!(BackoffPolicy::exponential(first, max, f64::NAN).is_err());
        assert!(BackoffPolicy::exponential(first, max, 1.0001).is_ok());
    }

    #[test]
    fn test_max_attempts_counts_attempts_not_retries() {
        let policy = BackoffPolicy::fixed(Duration::from_millis(50)).with_max_attempts(3);
        // Attempts 0 and 1 failed: two more waits are allowed.
        assert!(matches!(policy.decide(0), BackoffDecision::Wait(_)));
        assert!(matches!(policy.decide(1), BackoffDecision::Wait(_)));
        // Attempt 2 was the third: done.
        assert_eq!(policy.decide(2), BackoffDecision::GiveUp);
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = BackoffPolicy::fixed(Duration::from_millis(50)).with_max_attempts(1);
        assert_eq!(policy.decide(0), BackoffDecision::GiveUp);
    }

    #[test]
    fn test_full_jitter_stays_below_base() {
        let policy = exp(1000, 30, 2.0).with_jitter(JitterPolicy::Full);
        for attempt in 0..10 {
            let base_ms = (1000.0 * 2.0f64.powi(attempt)).min(30_000.0);
            match policy.decide(attempt as u32) {
                BackoffDecision::Wait(d) => assert!(
                    d <= Duration::from_millis(base_ms as u64),
                    "attempt {}: delay {:?} exceeds base {}ms",
                    attempt,
                    d,
                    base_ms
                ),
                BackoffDecision::GiveUp => panic!("uncapped policy gave up"),
            }
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        let policy = BackoffPolicy::fixed(Duration::from_millis(1000))
            .with_jitter(JitterPolicy::Equal);
        for _ in 0..50 {
            match policy.decide(0) {
                BackoffDecision::Wait(d) => {
                    assert!(d >= Duration::from_millis(500));
                    assert!(d <= Duration::from_millis(1000));
                }
                BackoffDecision::GiveUp => panic!("uncapped policy gave up"),
            }
        }
    }
}
