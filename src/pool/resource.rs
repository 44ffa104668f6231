//! # Pooled resource: RAII lease guard.
//!
//! [`PooledResource`] wraps a raw resource checked out of a
//! [`ResourcePool`](crate::ResourcePool). It derefs to the raw resource and
//! owns it exclusively for the duration of the lease; dropping the guard is
//! the release — the resource is re-enqueued for reuse and its orphan record
//! (if tracked) is removed.
//!
//! A guard dropped after the pool stopped destroys the resource instead of
//! re-enqueueing it; `destroyed` stays reachable only from an idle state.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::pool::factory::ResourceFactory;
use crate::pool::pool::PoolShared;

/// A leased resource; dropping it returns the resource to the pool.
pub struct PooledResource<F: ResourceFactory> {
    raw: Option<F::Resource>,
    lease: u64,
    shared: Arc<PoolShared<F>>,
}

impl<F: ResourceFactory> PooledResource<F> {
    pub(crate) fn new(raw: F::Resource, lease: u64, shared: Arc<PoolShared<F>>) -> Self {
        Self {
            raw: Some(raw),
            lease,
            shared,
        }
    }

    /// Returns the lease id (matches `lease` in pool events).
    pub fn lease_id(&self) -> u64 {
        self.lease
    }
}

impl<F: ResourceFactory> fmt::Debug for PooledResource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledResource")
            .field("lease", &self.lease)
            .finish_non_exhaustive()
    }
}

impl<F: ResourceFactory> Deref for PooledResource<F> {
    type Target = F::Resource;

    fn deref(&self) -> &Self::Target {
        self.raw.as_ref().expect("raw resource present until drop")
    }
}

impl<F: ResourceFactory> DerefMut for PooledResource<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.raw.as_mut().expect("raw resource present until drop")
    }
}

impl<F: ResourceFactory> Drop for PooledResource<F> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.shared.release(self.lease, raw);
        }
    }
}
