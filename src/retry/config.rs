//! # Retry configuration.
//!
//! [`RetryConfig`] bundles everything a retry driver needs besides the
//! operation itself: the backoff policy, optional predicates, the error
//! observer, an optional event bus and the cancellation token.
//!
//! The config is one immutable value constructed up front and passed by
//! value into [`RetryTask::spawn`](crate::RetryTask::spawn); there is no
//! half-configured builder state to share or mutate.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::RetryError;
use crate::events::Bus;
use crate::policies::BackoffPolicy;

/// Predicate over a produced value; `true` forces a retry despite success.
pub type ValuePredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Predicate over an attempt error; `true` stops retrying immediately.
pub type ErrorPredicate = Arc<dyn Fn(&RetryError) -> bool + Send + Sync>;

/// Observer invoked once per failed attempt with `(attempt, error)`.
pub type ErrorObserver = Arc<dyn Fn(u32, &RetryError) + Send + Sync>;

/// Configuration for one retry task.
///
/// ## Field semantics
/// - `backoff`: delay curve + attempt cap consulted after each failure.
/// - `token`: cancels the task when cancelled; defaults to a fresh token.
///   Pass a child of a longer-lived token to tie the task to an enclosing
///   lifetime (the pool does this for replenishments).
/// - `bus`: where lifecycle events go; `None` disables publishing.
/// - `retry_if`: flags a structurally successful value as unacceptable;
///   the attempt is then scheduled like a failure (see
///   [`RetryError::Rejected`]).
/// - `give_up_when`: stops retrying early on matching errors. Independent of
///   this predicate, errors with `is_retryable() == false` always stop
///   retrying.
/// - `on_error`: diagnostic callback per failed attempt. Panics inside it are
///   swallowed and never affect the outcome.
pub struct RetryConfig<T> {
    /// Delay curve and attempt cap.
    pub backoff: BackoffPolicy,
    /// Cancellation root for this task.
    pub token: CancellationToken,
    /// Event bus for lifecycle events (`None` = don't publish).
    pub bus: Option<Bus>,
    /// Forces a retry when a produced value is semantically unacceptable.
    pub retry_if: Option<ValuePredicate<T>>,
    /// Stops retrying early on matching errors.
    pub give_up_when: Option<ErrorPredicate>,
    /// Per-failed-attempt observer (panics swallowed).
    pub on_error: Option<ErrorObserver>,
}

impl<T> Default for RetryConfig<T> {
    /// Returns a config with the default backoff (fixed 100ms, 10 attempts),
    /// a fresh cancellation token, no bus, and no predicates.
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            token: CancellationToken::new(),
            bus: None,
            retry_if: None,
            give_up_when: None,
            on_error: None,
        }
    }
}

impl<T> Clone for RetryConfig<T> {
    fn clone(&self) -> Self {
        Self {
            backoff: self.backoff,
            token: self.token.clone(),
            bus: self.bus.clone(),
            retry_if: self.retry_if.clone(),
            give_up_when: self.give_up_when.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T> RetryConfig<T> {
    /// Creates a config with the given backoff and defaults elsewhere.
    pub fn with_backoff(backoff: BackoffPolicy) -> Self {
        Self {
            backoff,
            ..Self::default()
        }
    }
}
