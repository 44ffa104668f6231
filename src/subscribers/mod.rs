//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used to deliver runtime events broadcast through the
//! [`Bus`](crate::events::Bus) to user-defined handlers.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   retry driver / pool ── publish(Event) ──► Bus ──► pool listener
//!                                                        │
//!                                                        ▼
//!                                               SubscriberSet::emit()
//!                                              ┌─────────┼─────────┐
//!                                              ▼         ▼         ▼
//!                                          LogWriter  Metrics   Custom
//! ```
//!
//! Subscribers observe and react (logging, metrics, alerting); they never
//! influence retry or pool decisions, and their panics are isolated.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
