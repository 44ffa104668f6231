//! # poolvisor
//!
//! **Poolvisor** is a lightweight resource-pooling library for async Rust.
//!
//! It provides two primitives: a cancellable, backoff-driven **retry task**
//! for any "keep trying until it works" job, and a fixed-capacity
//! **resource pool** that fills and heals itself through those retry tasks.
//! The crate is designed as a building block for clients that hold scarce
//! connections (databases, brokers, upstream services).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     caller                      caller                      caller
//!        │ acquire(timeout)          │                           │
//!        ▼                           ▼                           ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ResourcePool (capacity N)                                        │
//! │  - idle queue + permit accounting (never exceeds N live members)  │
//! │  - validate-on-checkout, replace invalid members                  │
//! │  - orphan sweep (reports leases held past a threshold)            │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  RetryTask   │   │  RetryTask   │   │  RetryTask   │   │
//!     │ (create #1)  │   │ (create #2)  │   │ (create #N)  │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Publishes        │ Publishes        │ Publishes       │
//!      │ - AttemptStarted │ - AttemptFailed  │ - BackoffSched. │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │   pool fan-out task    │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          (per-sub queues + workers)
//! ```
//!
//! ### Retry lifecycle
//! ```text
//! RetryTask::spawn(operation, RetryConfig) ──► RetryHandle
//!
//! loop {
//!   ├─► run operation (raced against cancellation)
//!   ├─► Ok(v)  ──► retry_if rejects v? ─ no ─► complete Ok(v)
//!   │                     │ yes
//!   │                     ▼ synthetic Rejected error
//!   ├─► on_error observer (panics swallowed)
//!   ├─► non-retryable / give_up_when ──► complete Err(last error)
//!   └─► backoff.decide(attempt)
//!        ├─ GiveUp  ──► complete Err(last error)
//!        └─ Wait(d) ──► cancellable sleep(d), next attempt
//! }
//!
//! RetryHandle: cancel() / is_finished() / is_cancelled() / join().await
//! ```
//!
//! ## Features
//! | Area              | Description                                                          | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------------|---------------------------------------------|
//! | **Retry**         | Drive an async operation to success with backoff and cancellation.   | [`RetryTask`], [`RetryConfig`], [`RetryHandle`] |
//! | **Policies**      | Delay curves, attempt caps and jitter.                               | [`BackoffPolicy`], [`BackoffDecision`], [`JitterPolicy`] |
//! | **Pooling**       | Fixed-capacity, self-healing pool of validated resources.            | [`ResourcePool`], [`PoolConfig`], [`PooledResource`] |
//! | **Seams**         | Closure-friendly traits for operations and factories.                | [`Operation`], [`OperationFn`], [`ResourceFactory`], [`FactoryFn`] |
//! | **Errors**        | Typed errors with explicit retryability.                             | [`RetryError`], [`PoolError`], [`ConfigError`] |
//! | **Observability** | Lifecycle events, broadcast bus, subscriber fan-out.                 | [`Event`], [`EventKind`], [`Bus`], [`Subscribe`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use poolvisor::{
//!     BackoffPolicy, FactoryFn, PoolConfig, ResourcePool, RetryError,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A factory producing one raw resource per call (possibly failing).
//!     let factory = FactoryFn::new("greeting", |_ctx: CancellationToken| async {
//!         Ok::<_, RetryError>(String::from("hello"))
//!     });
//!
//!     let config = PoolConfig {
//!         capacity: 2,
//!         backoff: BackoffPolicy::fixed(Duration::from_millis(100)),
//!         ..PoolConfig::default()
//!     };
//!
//!     let pool = ResourcePool::new(config, factory);
//!     pool.start();
//!
//!     let greeting = pool.acquire(Duration::from_secs(1)).await?;
//!     assert_eq!(&*greeting, "hello");
//!     drop(greeting); // back into the pool
//!
//!     pool.stop().await;
//!     Ok(())
//! }
//! ```

mod error;
mod events;
mod policies;
mod pool;
mod retry;
mod subscribers;

// ---- Public re-exports ----

pub use error::{ConfigError, PoolError, RetryError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffDecision, BackoffKind, BackoffPolicy, JitterPolicy};
pub use pool::{FactoryFn, PoolConfig, PooledResource, ResourceFactory, ResourcePool};
pub use retry::{
    ErrorObserver, ErrorPredicate, Operation, OperationFn, OperationRef, RetryConfig, RetryHandle,
    RetryTask, ValuePredicate,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
