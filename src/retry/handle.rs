//! # Cancellable handle to a running retry task.
//!
//! [`RetryHandle`] is the caller-facing side of a retry task: it exposes
//! cooperative cancellation, completion checks, and an awaitable accessor
//! for the single-assignment outcome.
//!
//! The outcome travels through a `tokio::sync::oneshot` channel, so it is
//! written at most once by construction; whichever driver path reaches a
//! terminal state first sends it, and nothing can overwrite it afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::RetryError;

/// Handle to a spawned retry task.
///
/// Obtained from [`RetryTask::spawn`](crate::RetryTask::spawn).
///
/// ## Semantics
/// - [`cancel`](Self::cancel) is cooperative, idempotent and never fails.
///   A task cancelled mid-attempt discards the attempt's result; a task
///   that already completed ignores the cancel.
/// - [`join`](Self::join) yields the successful value or the terminal error
///   ([`RetryError::Canceled`] after cancellation).
pub struct RetryHandle<T> {
    token: CancellationToken,
    done: Arc<AtomicBool>,
    rx: oneshot::Receiver<Result<T, RetryError>>,
}

impl<T> RetryHandle<T> {
    pub(crate) fn new(
        token: CancellationToken,
        done: Arc<AtomicBool>,
        rx: oneshot::Receiver<Result<T, RetryError>>,
    ) -> Self {
        Self { token, done, rx }
    }

    /// Requests cooperative cancellation.
    ///
    /// No further attempts are scheduled and any in-flight attempt's result
    /// is discarded. Idempotent; a no-op once the task reached a terminal
    /// state.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the task reached a terminal state (success, failure or
    /// observed cancellation).
    pub fn is_finished(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Waits for the terminal outcome.
    ///
    /// Returns the produced value, the last real attempt error, or
    /// [`RetryError::Canceled`] if the task was cancelled (including the
    /// driver being torn down with the runtime before completing).
    pub async fn join(self) -> Result<T, RetryError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(RetryError::Canceled),
        }
    }
}
