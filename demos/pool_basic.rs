//! # Example: pool_basic
//!
//! Demonstrates a small [`ResourcePool`] end to end: start-up fill through
//! retry tasks, checkout with validation, release by dropping the guard,
//! exhaustion under a short timeout, and shutdown.
//!
//! ## Run
//! ```bash
//! cargo run --example pool_basic --features logging
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use poolvisor::{BackoffPolicy, FactoryFn, PoolConfig, ResourcePool, RetryError};
use tokio_util::sync::CancellationToken;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. A factory that fails its first creation, then produces numbered
    //    "connections" (plain strings here).
    let factory = FactoryFn::new("demo-conn", |_ctx: CancellationToken| async {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        if id == 0 {
            println!("[factory] transient failure for #{id}");
            Err(RetryError::failed("backend warming up"))
        } else {
            println!("[factory] created connection #{id}");
            Ok(format!("conn-{id}"))
        }
    });

    // 2. Two slots, quick fixed-delay creation retries
    let config = PoolConfig {
        capacity: 2,
        backoff: BackoffPolicy::fixed(Duration::from_millis(50)),
        ..PoolConfig::default()
    };

    #[cfg(feature = "logging")]
    let pool = ResourcePool::with_subscribers(
        config,
        factory,
        vec![std::sync::Arc::new(poolvisor::LogWriter)],
    );
    #[cfg(not(feature = "logging"))]
    let pool = ResourcePool::new(config, factory);

    pool.start();

    // 3. Lease both slots
    let first = pool.acquire(Duration::from_secs(2)).await?;
    let second = pool.acquire(Duration::from_secs(2)).await?;
    println!("[main] leased {} and {}", *first, *second);

    // 4. A third caller times out while both are leased
    match pool.acquire(Duration::from_millis(100)).await {
        Err(err) => println!("[main] expected exhaustion: {err}"),
        Ok(_) => unreachable!("no free slot existed"),
    }

    // 5. Releasing one slot makes it reusable immediately
    drop(first);
    let third = pool.acquire(Duration::from_millis(100)).await?;
    println!("[main] re-leased {}", *third);

    drop(second);
    drop(third);
    pool.stop().await;
    println!("[main] done.");
    Ok(())
}
