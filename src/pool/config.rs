//! # Pool configuration.
//!
//! Provides [`PoolConfig`], the centralized settings for a
//! [`ResourcePool`](crate::ResourcePool).
//!
//! One immutable value, constructed up front and passed into
//! [`ResourcePool::new`](crate::ResourcePool::new). Orphan tracking is off by
//! default; when enabled, `orphan_after` and `sweep_interval` control the
//! diagnostic sweep.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Configuration for a resource pool.
///
/// ## Field semantics
/// - `capacity`: number of pool slots; the count of live raw resources never
///   exceeds it.
/// - `backoff`: retry policy for resource creation (start-up fill and
///   replacement of invalid resources).
/// - `check_on_acquire`: validate resources at checkout; invalid ones are
///   destroyed and replaced transparently.
/// - `track_orphans`: record each lease with an acquire-time call-stack
///   snapshot and report leases older than `orphan_after`.
/// - `orphan_after`: lease age at which a lease counts as orphaned.
/// - `sweep_interval`: how often the orphan sweep runs.
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus).
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of pool slots.
    pub capacity: usize,

    /// Backoff policy for resource creation retries.
    ///
    /// The default retries forever with a fixed 10s delay: a pool is
    /// long-lived and its backend usually comes back eventually.
    pub backoff: BackoffPolicy,

    /// Validate resources at checkout.
    pub check_on_acquire: bool,

    /// Track outstanding leases and report overdue ones.
    pub track_orphans: bool,

    /// Lease age threshold for orphan reports.
    pub orphan_after: Duration,

    /// Period of the orphan sweep.
    pub sweep_interval: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Default for PoolConfig {
    /// Default configuration:
    ///
    /// - `capacity = 10`
    /// - `backoff = fixed 10s, retry forever`
    /// - `check_on_acquire = true`
    /// - `track_orphans = false` (`orphan_after = 60s`, `sweep_interval = 30s`)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            capacity: 10,
            backoff: BackoffPolicy::fixed(Duration::from_secs(10)),
            check_on_acquire: true,
            track_orphans: false,
            orphan_after: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(30),
            bus_capacity: 1024,
        }
    }
}

impl PoolConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}
