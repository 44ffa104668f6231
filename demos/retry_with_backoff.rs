//! # Example: retry_with_backoff
//!
//! Demonstrates how [`RetryTask`] drives a flaky operation to success
//! according to an exponential [`BackoffPolicy`].
//!
//! The operation fails several times before succeeding, showing how backoff
//! delay and jitter are applied between attempts.
//!
//! ## Flow
//! ```text
//! RetryTask::spawn(op, cfg)
//!   ├─► attempt 0 → Err("boom #0")
//!   ├─► BackoffScheduled{delay=100ms}, sleep
//!   ├─► attempt 1 → Err("boom #1")
//!   ├─► BackoffScheduled{delay≈200ms}, sleep
//!   ├─► attempt 2 → Ok(value)
//!   └─► handle.join() → Ok(value)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example retry_with_backoff
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use poolvisor::{
    BackoffPolicy, Bus, EventKind, JitterPolicy, OperationFn, RetryConfig, RetryError, RetryTask,
};
use tokio_util::sync::CancellationToken;

static FAIL_COUNT: AtomicU64 = AtomicU64::new(0);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Watch lifecycle events directly on the bus
    let bus = Bus::new(100);
    let mut rx = bus.subscribe();
    let watcher = tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            match ev.kind {
                EventKind::AttemptFailed => {
                    println!("[events] failed attempt={:?} err={:?}", ev.attempt, ev.reason)
                }
                EventKind::BackoffScheduled => {
                    println!("[events] backoff delay_ms={:?}", ev.delay_ms)
                }
                EventKind::RetrySucceeded => {
                    println!("[events] succeeded attempt={:?}", ev.attempt)
                }
                _ => {}
            }
        }
    });

    // 2. Define an operation that fails twice before succeeding
    let flaky = OperationFn::arc("flaky", |ctx: CancellationToken| async move {
        if ctx.is_cancelled() {
            return Err(RetryError::Canceled);
        }
        let attempt = FAIL_COUNT.fetch_add(1, Ordering::Relaxed);
        if attempt < 2 {
            println!("[flaky] simulated failure #{attempt}");
            Err(RetryError::failed(format!("boom #{attempt}")))
        } else {
            println!("[flaky] success on attempt {attempt}");
            Ok("ready")
        }
    });

    // 3. Exponential backoff with equal jitter, at most 10 attempts
    let backoff = BackoffPolicy::exponential(
        Duration::from_millis(100),
        Duration::from_secs(2),
        2.0,
    )?
    .with_max_attempts(10)
    .with_jitter(JitterPolicy::Equal);

    let config = RetryConfig {
        backoff,
        bus: Some(bus.clone()),
        ..RetryConfig::default()
    };

    // 4. Spawn and await the outcome
    let handle = RetryTask::spawn(flaky, config);
    let value = handle.join().await?;
    println!("[main] outcome: {value}");

    drop(bus);
    let _ = watcher.await;
    Ok(())
}
