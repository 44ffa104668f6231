//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by retry drivers, the
//! resource pool, lease guards and the orphan sweep.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the retry driver, `ResourcePool`, `PooledResource`
//!   drop glue, the orphan sweep.
//! - **Consumers**: the pool's subscriber listener (fans out to
//!   `SubscriberSet`), plus any direct `Bus::subscribe()` caller.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
