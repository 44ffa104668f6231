//! # Orphan tracking: diagnostic registry of outstanding leases.
//!
//! When enabled, the pool records every lease here at acquire time together
//! with a call-stack snapshot, and removes the record at release. A periodic
//! sweep reports leases older than the configured threshold.
//!
//! ## Rules
//! - Pure diagnostics: the sweep never reclaims a resource (the holder may be
//!   a legitimate long-running caller).
//! - The registry is independent of the idle queue; losing an acquire-time
//!   race between the two affects reports only, never resource accounting.
//! - An over-age lease is re-reported on every sweep while it remains
//!   outstanding.

use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// One outstanding lease.
struct LeaseRecord {
    acquired_at: Instant,
    acquired_from: Backtrace,
}

/// An over-age lease found by a sweep.
pub(crate) struct OrphanReport {
    /// Lease id.
    pub lease: u64,
    /// Age at sweep time.
    pub age: Duration,
    /// Call stack captured when the lease was acquired.
    pub acquired_from: String,
}

/// Concurrency-safe registry of outstanding leases.
pub(crate) struct OrphanTracker {
    leases: Mutex<HashMap<u64, LeaseRecord>>,
}

impl OrphanTracker {
    pub(crate) fn new() -> Self {
        Self {
            leases: Mutex::new(HashMap::new()),
        }
    }

    /// Records a lease, capturing the acquiring call stack.
    pub(crate) fn insert(&self, lease: u64) {
        let record = LeaseRecord {
            acquired_at: Instant::now(),
            acquired_from: Backtrace::force_capture(),
        };
        self.leases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(lease, record);
    }

    /// Removes a lease record; `false` signals the record was missing.
    pub(crate) fn remove(&self, lease: u64) -> bool {
        self.leases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&lease)
            .is_some()
    }

    /// Returns all leases at least `older_than` old.
    pub(crate) fn sweep(&self, older_than: Duration) -> Vec<OrphanReport> {
        let now = Instant::now();
        let leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);

        let mut reports = Vec::new();
        for (lease, record) in leases.iter() {
            let age = now.saturating_duration_since(record.acquired_at);
            if age >= older_than {
                reports.push(OrphanReport {
                    lease: *lease,
                    age,
                    acquired_from: format!("{}", record.acquired_from),
                });
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_remove_leaves_nothing() {
        let tracker = OrphanTracker::new();
        tracker.insert(1);
        assert!(tracker.remove(1));
        assert!(tracker.sweep(Duration::ZERO).is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_record_is_flagged() {
        let tracker = OrphanTracker::new();
        assert!(!tracker.remove(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_reports_only_over_age_leases() {
        let tracker = OrphanTracker::new();
        tracker.insert(1);
        tokio::time::advance(Duration::from_secs(30)).await;
        tracker.insert(2);

        let reports = tracker.sweep(Duration::from_secs(20));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].lease, 1);
        assert!(reports[0].age >= Duration::from_secs(30));
    }
}
