//! Resource pooling: factory seam, configuration, lease guard and the pool.
//!
//! This module provides the bounded pool built on the retry engine:
//! - [`ResourceFactory`], [`FactoryFn`] — how members are created, validated
//!   and disposed of;
//! - [`PoolConfig`] — capacity, creation backoff, validation and orphan
//!   tracking knobs;
//! - [`ResourcePool`] — start / stop / acquire;
//! - [`PooledResource`] — the RAII lease guard (drop = release).

mod config;
mod factory;
mod orphan;
#[allow(clippy::module_inception)]
mod pool;
mod resource;

pub use config::PoolConfig;
pub use factory::{FactoryFn, ResourceFactory};
pub use pool::ResourcePool;
pub use resource::PooledResource;
