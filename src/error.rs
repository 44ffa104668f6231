//! Error types used by the retry scheduler and the resource pool.
//!
//! This module defines three error enums:
//!
//! - [`RetryError`] — errors raised by (or about) a retried operation.
//! - [`PoolError`] — errors raised by [`ResourcePool::acquire`](crate::ResourcePool::acquire).
//! - [`ConfigError`] — invalid policy configuration, rejected at construction.
//!
//! Retryability is an explicit classification attached where the operation is
//! invoked ([`RetryError::is_retryable`]), never inferred from error nesting.
//! Pool exhaustion is deliberately a separate type so callers can always tell
//! "no resource available" apart from "the operation itself failed".

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by a retried operation or the retry scheduler.
///
/// [`RetryError::Failed`] and [`RetryError::Rejected`] are transient and
/// subject to the backoff policy; [`RetryError::Fatal`] stops retrying
/// immediately; [`RetryError::Canceled`] is the terminal state of a
/// cancelled [`RetryHandle`](crate::RetryHandle).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Attempt failed with a transient error; may succeed if retried.
    #[error("attempt failed: {reason}")]
    Failed {
        /// The underlying error message.
        reason: String,
    },

    /// Non-recoverable error; retrying will not be attempted.
    #[error("fatal error (no retry): {reason}")]
    Fatal {
        /// The underlying error message.
        reason: String,
    },

    /// Attempt produced a value the caller's `retry_if` predicate rejected.
    ///
    /// Synthetic: scheduled like a failure, but a later successful attempt
    /// replaces it entirely. Surfaces only if retries run out while every
    /// produced value keeps being rejected.
    #[error("result rejected: {reason}")]
    Rejected {
        /// Why the value was unacceptable.
        reason: String,
    },

    /// The retry task was cancelled before reaching a real outcome.
    #[error("retry canceled")]
    Canceled,
}

impl RetryError {
    /// Creates a transient [`RetryError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        RetryError::Failed {
            reason: reason.into(),
        }
    }

    /// Creates a non-retryable [`RetryError::Fatal`].
    pub fn fatal(reason: impl Into<String>) -> Self {
        RetryError::Fatal {
            reason: reason.into(),
        }
    }

    /// Creates a synthetic [`RetryError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        RetryError::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::RetryError;
    ///
    /// let err = RetryError::failed("connection refused");
    /// assert_eq!(err.as_label(), "retry_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::Failed { .. } => "retry_failed",
            RetryError::Fatal { .. } => "retry_fatal",
            RetryError::Rejected { .. } => "retry_rejected",
            RetryError::Canceled => "retry_canceled",
        }
    }

    /// Indicates whether the error is safe to retry.
    ///
    /// Returns `true` for [`RetryError::Failed`] and [`RetryError::Rejected`],
    /// `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use poolvisor::RetryError;
    ///
    /// assert!(RetryError::failed("boom").is_retryable());
    /// assert!(!RetryError::fatal("bad credentials").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetryError::Failed { .. } | RetryError::Rejected { .. }
        )
    }
}

/// # Errors produced by pool acquisition.
///
/// Distinct from [`RetryError`] so that "the pool could not supply a
/// resource in time" is never confused with an operation failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No valid resource became available within the caller's timeout.
    #[error("no available resources in the pool after {timeout:?}")]
    Exhausted {
        /// The wall-clock budget that elapsed.
        timeout: Duration,
    },
}

impl PoolError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PoolError::Exhausted { .. } => "pool_exhausted",
        }
    }
}

/// # Invalid policy configuration.
///
/// Raised at construction time, never during a scheduling run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Exponential backoff requires a multiplicative factor greater than 1.
    #[error("exponential backoff factor must be > 1, got {factor}")]
    FactorOutOfRange {
        /// The rejected factor.
        factor: f64,
    },
}
