//! Backoff and jitter policies.
//!
//! This module groups the knobs that control **how long** a retry task waits
//! between attempts and **when** it gives up.
//!
//! ## Contents
//! - [`BackoffPolicy`] delay curve (fixed / exponential) plus attempt cap
//! - [`BackoffDecision`] per-attempt outcome (`Wait(d)` / `GiveUp`)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! RetryConfig { backoff: BackoffPolicy, .. }
//!      └─► retry::task driver uses:
//!           - backoff.decide(attempt) after each failed attempt
//!           - Wait(d)  → cancellable sleep, then next attempt
//!           - GiveUp   → complete the handle with the last real error
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → fixed 100ms delay, at most 10 attempts.
//! - `JitterPolicy::None` by default; consider `Equal` when many retry tasks
//!   start simultaneously.

mod backoff;
mod jitter;

pub use backoff::{BackoffDecision, BackoffKind, BackoffPolicy};
pub use jitter::JitterPolicy;
