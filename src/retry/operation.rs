//! # Operation abstraction and function-backed implementation.
//!
//! This module defines the [`Operation`] trait (async, cancelable, produces a
//! value) and a convenient function-backed implementation [`OperationFn`].
//! The common handle type is [`OperationRef`], an `Arc<dyn Operation>`
//! suitable for sharing with a retry driver.
//!
//! An operation receives a [`CancellationToken`] and should periodically
//! check it to stop cooperatively when the retry task is cancelled.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RetryError;

/// # Asynchronous, cancelable unit of work that yields a value.
///
/// An `Operation` has a stable [`label`](Operation::label) (used in events)
/// and an async [`run`](Operation::run) method invoked once per attempt.
/// Implementors should regularly check cancellation and exit promptly when
/// the owning retry task is cancelled.
///
/// Errors carry an explicit retryability classification: return
/// [`RetryError::Failed`] for transient conditions and
/// [`RetryError::Fatal`] for conditions where retrying is pointless.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    /// The value a successful attempt produces.
    type Output: Send + 'static;

    /// Returns a stable, human-readable label for events and logs.
    fn label(&self) -> &str {
        "operation"
    }

    /// Executes one attempt.
    async fn run(&self, ctx: CancellationToken) -> Result<Self::Output, RetryError>;
}

/// Shared handle to an operation (`Arc<dyn Operation>`).
pub type OperationRef<T> = Arc<dyn Operation<Output = T>>;

/// Function-backed operation implementation.
///
/// Wraps a closure that *creates* a new future per attempt, so no mutable
/// state is shared between attempts; if attempts need common state, put an
/// `Arc<...>` inside the closure explicitly.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use poolvisor::{OperationFn, OperationRef, RetryError};
///
/// let op: OperationRef<u32> = OperationFn::arc("answer", |_ctx: CancellationToken| async {
///     Ok::<_, RetryError>(42)
/// });
///
/// assert_eq!(op.label(), "answer");
/// ```
pub struct OperationFn<F> {
    label: Cow<'static, str>,
    f: F,
}

impl<F> OperationFn<F> {
    /// Creates a new function-backed operation.
    ///
    /// Prefer [`OperationFn::arc`] when you immediately need an
    /// [`OperationRef`].
    pub fn new(label: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }

    /// Creates the operation and returns it as a shared handle.
    pub fn arc(label: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(label, f))
    }
}

#[async_trait]
impl<F, Fut, T> Operation for OperationFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<T, RetryError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn label(&self) -> &str {
        &self.label
    }

    async fn run(&self, ctx: CancellationToken) -> Result<T, RetryError> {
        (self.f)(ctx).await
    }
}
