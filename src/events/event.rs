//! # Runtime events emitted by retry tasks and the resource pool.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Attempt events**: per-attempt retry flow (started, failed, backoff)
//! - **Terminal events**: final retry outcomes (succeeded, exhausted, aborted, canceled)
//! - **Pool events**: pool and resource lifecycle (started, stopped, created, destroyed, leases)
//!
//! The [`Event`] struct carries optional metadata such as timestamps, source
//! labels, attempt numbers, delays, lease ids and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use poolvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_source("db-conn")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(400))
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.source.as_deref(), Some("db-conn"));
//! assert_eq!(ev.delay_ms, Some(400));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Retry attempt events ===
    /// A retry task is starting an attempt.
    ///
    /// Sets:
    /// - `source`: operation label
    /// - `attempt`: attempt index (zero-based)
    AttemptStarted,

    /// An attempt completed with an error (or a rejected value).
    ///
    /// Sets:
    /// - `source`: operation label
    /// - `attempt`: attempt index
    /// - `reason`: failure message
    AttemptFailed,

    /// Next attempt scheduled after a failed one.
    ///
    /// Sets:
    /// - `source`: operation label
    /// - `attempt`: index of the attempt that failed
    /// - `delay_ms`: delay before the next attempt (ms)
    /// - `reason`: last failure message
    BackoffScheduled,

    // === Retry terminal events ===
    /// The retry task completed successfully.
    ///
    /// Sets:
    /// - `source`: operation label
    /// - `attempt`: index of the successful attempt
    RetrySucceeded,

    /// The backoff policy gave up; the last attempt's error is terminal.
    ///
    /// Sets:
    /// - `source`: operation label
    /// - `attempt`: index of the last attempt
    /// - `reason`: terminal error message
    RetryExhausted,

    /// Retrying stopped early on a non-retryable error.
    ///
    /// Sets:
    /// - `source`: operation label
    /// - `attempt`: index of the last attempt
    /// - `reason`: terminal error message
    RetryAborted,

    /// The retry task was cancelled before reaching a real outcome.
    ///
    /// Sets:
    /// - `source`: operation label
    /// - `attempt`: index of the last started attempt
    RetryCanceled,

    // === Pool lifecycle events ===
    /// The pool started and began replenishing its slots.
    ///
    /// Sets:
    /// - `source`: factory label
    PoolStarted,

    /// The pool stopped; idle resources were destroyed.
    ///
    /// Sets:
    /// - `source`: factory label
    PoolStopped,

    /// A replenishment succeeded and the resource was enqueued as idle.
    ///
    /// Sets:
    /// - `source`: factory label
    ResourceCreated,

    /// A checked-out resource failed validation and will be replaced.
    ///
    /// Sets:
    /// - `source`: factory label
    ResourceInvalid,

    /// A raw resource was destroyed (pool stop or failed validation).
    ///
    /// Sets:
    /// - `source`: factory label
    /// - `reason`: why it was destroyed
    ResourceDestroyed,

    /// A replenishment retry task gave up; the pool permanently lost a slot.
    ///
    /// Sets:
    /// - `source`: factory label
    /// - `reason`: terminal creation error
    ReplenishAbandoned,

    /// A resource was leased to a caller.
    ///
    /// Sets:
    /// - `source`: factory label
    /// - `lease`: lease id
    LeaseAcquired,

    /// A leased resource was returned to the pool.
    ///
    /// Sets:
    /// - `source`: factory label
    /// - `lease`: lease id
    LeaseReleased,

    /// A lease exceeded the configured orphan threshold without release.
    ///
    /// Observability signal only: the resource is not reclaimed, since the
    /// holder may be a legitimate long-running caller.
    ///
    /// Sets:
    /// - `source`: factory label
    /// - `lease`: lease id
    /// - `age_ms`: lease age at sweep time (ms)
    /// - `reason`: call-stack snapshot captured at acquire time
    LeaseOrphaned,

    /// A lease was released with no matching tracking record.
    ///
    /// Programming-error signal (double release bookkeeping or tracking
    /// toggled mid-lease), reported rather than silently ignored.
    ///
    /// Sets:
    /// - `source`: factory label
    /// - `lease`: lease id
    ReleaseUntracked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Label of the operation / factory / subscriber, if applicable.
    pub source: Option<Arc<str>>,
    /// Attempt index (zero-based).
    pub attempt: Option<u32>,
    /// Backoff delay before next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Lease id, for pool lease events.
    pub lease: Option<u64>,
    /// Lease age in milliseconds, for orphan reports (compact).
    pub age_ms: Option<u64>,
    /// Human-readable reason (errors, overflow details, backtraces).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            attempt: None,
            delay_ms: None,
            lease: None,
            age_ms: None,
            reason: None,
        }
    }

    /// Attaches a source label (operation / factory / subscriber).
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches an attempt index.
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a lease id.
    #[inline]
    pub fn with_lease(mut self, lease: u64) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Attaches a lease age (stored as milliseconds).
    #[inline]
    pub fn with_age(mut self, age: Duration) -> Self {
        let ms = age.as_millis().min(u128::from(u64::MAX)) as u64;
        self.age_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
