//! # Resource factory seam.
//!
//! [`ResourceFactory`] is the collaborator interface the pool consumes: how
//! to create one raw resource (possibly failing), how to check its liveness,
//! and how to dispose of it. The pool never knows anything else about its
//! members.
//!
//! "Closeable" maps onto Rust ownership: the default [`destroy`]
//! implementation simply drops the resource, which is how most client
//! libraries release their handles; override it when teardown needs more.
//!
//! [`destroy`]: ResourceFactory::destroy

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RetryError;

/// Produces, validates and disposes of one kind of raw resource.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use poolvisor::{ResourceFactory, RetryError};
/// use tokio_util::sync::CancellationToken;
///
/// struct Session {
///     endpoint: String,
///     healthy: bool,
/// }
///
/// struct SessionFactory {
///     endpoint: String,
/// }
///
/// #[async_trait]
/// impl ResourceFactory for SessionFactory {
///     type Resource = Session;
///
///     fn name(&self) -> &str {
///         "session"
///     }
///
///     async fn create(&self, _ctx: CancellationToken) -> Result<Session, RetryError> {
///         // dial self.endpoint here; transient errors become RetryError::Failed
///         Ok(Session {
///             endpoint: self.endpoint.clone(),
///             healthy: true,
///         })
///     }
///
///     async fn validate(&self, session: &mut Session) -> bool {
///         session.healthy
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceFactory: Send + Sync + 'static {
    /// The raw resource type managed by the pool.
    type Resource: Send + 'static;

    /// Returns a stable, human-readable label for events and logs.
    fn name(&self) -> &str {
        "resource"
    }

    /// Creates one raw resource.
    ///
    /// Invoked from a retry task; transient failures should be
    /// [`RetryError::Failed`] so the pool keeps trying per its backoff,
    /// [`RetryError::Fatal`] abandons the slot. The token is cancelled when
    /// the pool stops.
    async fn create(&self, ctx: CancellationToken) -> Result<Self::Resource, RetryError>;

    /// Checks liveness at checkout. Defaults to always valid.
    async fn validate(&self, _resource: &mut Self::Resource) -> bool {
        true
    }

    /// Disposes of a raw resource. Defaults to dropping it.
    fn destroy(&self, resource: Self::Resource) {
        drop(resource);
    }
}

/// Function-backed factory implementation.
///
/// Wraps a closure that creates one resource per call; validation stays at
/// the default (always valid) and destruction is a plain drop. Implement
/// [`ResourceFactory`] directly when you need either hook.
///
/// ## Example
/// ```rust
/// use poolvisor::{FactoryFn, RetryError};
/// use tokio_util::sync::CancellationToken;
///
/// let factory = FactoryFn::new("buffer", |_ctx: CancellationToken| async {
///     Ok::<_, RetryError>(Vec::<u8>::with_capacity(4096))
/// });
/// ```
pub struct FactoryFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> FactoryFn<F> {
    /// Creates a new function-backed factory.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the factory and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut, R> ResourceFactory for FactoryFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, RetryError>> + Send + 'static,
    R: Send + 'static,
{
    type Resource = R;

    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, ctx: CancellationToken) -> Result<R, RetryError> {
        (self.f)(ctx).await
    }
}
