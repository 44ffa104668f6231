//! # ResourcePool: fixed-capacity pool of retried, validated resources.
//!
//! The pool owns `capacity` slots. Each slot is filled by a retry task
//! driving [`ResourceFactory::create`] under the configured backoff; created
//! resources sit in an idle queue until checked out with
//! [`ResourcePool::acquire`]. Dropping the returned guard releases the
//! resource back into the queue.
//!
//! ## Data flow
//! ```text
//! start() ──► capacity × RetryTask(create) ──► idle queue ──► acquire()
//!                   ▲                                            │
//!                   │ replacement (one per discard)              ▼
//!             validation failed ◄────────────────────── validate-on-checkout
//!
//! release (guard drop) ──► idle queue (or destroy, if pool stopped)
//! ```
//!
//! ## Accounting
//! A `tokio::sync::Semaphore` mirrors the idle queue: one permit per queued
//! resource. `acquire` waits on the semaphore under the caller's timeout and
//! consumes the permit of the resource it pops; enqueueing (creation or
//! release) adds the permit back. The number of live raw resources therefore
//! never exceeds `capacity`: resources are only created by the `capacity`
//! start-up tasks plus exactly one replacement per destroyed invalid
//! resource.
//!
//! ## Per-resource state machine
//! ```text
//! absent ──► creating ──► idle ──► leased ──► idle
//!               ▲           │         │
//!               │           ▼         ▼  (only after stop)
//!               └────── destroyed ◄───┘
//! ```
//! `destroyed` is terminal and never entered from `leased` while the pool is
//! running; a leased resource is the caller's until released.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::{PoolError, RetryError};
use crate::events::{Bus, Event, EventKind};
use crate::pool::config::PoolConfig;
use crate::pool::factory::ResourceFactory;
use crate::pool::orphan::OrphanTracker;
use crate::pool::resource::PooledResource;
use crate::retry::{Operation, RetryConfig, RetryTask};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Bridges a [`ResourceFactory`] into the retry engine's operation seam.
struct FactoryOperation<F: ResourceFactory> {
    factory: Arc<F>,
}

#[async_trait]
impl<F: ResourceFactory> Operation for FactoryOperation<F> {
    type Output = F::Resource;

    fn label(&self) -> &str {
        self.factory.name()
    }

    async fn run(&self, ctx: CancellationToken) -> Result<F::Resource, RetryError> {
        self.factory.create(ctx).await
    }
}

/// State shared between the pool, its lease guards and background tasks.
pub(crate) struct PoolShared<F: ResourceFactory> {
    pub(crate) config: PoolConfig,
    pub(crate) factory: Arc<F>,
    pub(crate) bus: Bus,
    pub(crate) token: CancellationToken,

    idle: Mutex<VecDeque<F::Resource>>,
    available: Semaphore,
    orphans: OrphanTracker,
    lease_seq: AtomicU64,
}

impl<F: ResourceFactory> PoolShared<F> {
    /// Starts one fire-and-forget replenishment through the retry engine.
    ///
    /// The retry task inherits a child of the pool token, so stopping the
    /// pool cancels in-flight creations.
    fn spawn_replenish(self: &Arc<Self>) {
        let operation = Arc::new(FactoryOperation {
            factory: Arc::clone(&self.factory),
        });
        let config = RetryConfig {
            backoff: self.config.backoff,
            token: self.token.child_token(),
            bus: Some(self.bus.clone()),
            ..RetryConfig::default()
        };

        let handle = RetryTask::spawn(operation, config);
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            match handle.join().await {
                Ok(resource) => shared.add_idle(resource),
                Err(RetryError::Canceled) => {} // pool stopping
                Err(err) => shared.bus.publish(
                    shared
                        .event(EventKind::ReplenishAbandoned)
                        .with_reason(err.to_string()),
                ),
            }
        });
    }

    /// Enqueues a freshly created resource.
    fn add_idle(&self, resource: F::Resource) {
        match self.push_idle(resource) {
            None => self.bus.publish(self.event(EventKind::ResourceCreated)),
            Some(late) => self.destroy_resource(late, "pool stopped"),
        }
    }

    /// Returns a leased resource to the pool; called from the guard's drop.
    pub(crate) fn release(&self, lease: u64, resource: F::Resource) {
        if self.config.track_orphans && !self.orphans.remove(lease) {
            self.bus
                .publish(self.event(EventKind::ReleaseUntracked).with_lease(lease));
        }
        self.bus
            .publish(self.event(EventKind::LeaseReleased).with_lease(lease));

        if let Some(late) = self.push_idle(resource) {
            self.destroy_resource(late, "released after stop");
        }
    }

    /// Pushes into the idle queue and adds the matching permit.
    ///
    /// Hands the resource back if the pool already stopped; the stop-check
    /// runs under the queue lock, so a concurrent `stop()` either drains the
    /// pushed resource or this call sees the cancellation.
    fn push_idle(&self, resource: F::Resource) -> Option<F::Resource> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            return Some(resource);
        }
        idle.push_back(resource);
        drop(idle);
        self.available.add_permits(1);
        None
    }

    fn destroy_resource(&self, resource: F::Resource, reason: &'static str) {
        self.factory.destroy(resource);
        self.bus
            .publish(self.event(EventKind::ResourceDestroyed).with_reason(reason));
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_source(self.factory.name())
    }
}

/// Fixed-capacity pool of reusable resources.
///
/// See the [module docs](self) for the data flow and accounting rules.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use poolvisor::{FactoryFn, PoolConfig, ResourcePool, RetryError};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let factory = FactoryFn::new("buffer", |_ctx: CancellationToken| async {
///     Ok::<_, RetryError>(Vec::<u8>::with_capacity(4096))
/// });
///
/// let pool = ResourcePool::new(PoolConfig { capacity: 2, ..PoolConfig::default() }, factory);
/// pool.start();
///
/// let buf = pool.acquire(Duration::from_secs(1)).await.unwrap();
/// assert_eq!(buf.capacity(), 4096);
/// drop(buf); // release back into the pool
///
/// pool.stop().await;
/// # }
/// ```
pub struct ResourcePool<F: ResourceFactory> {
    shared: Arc<PoolShared<F>>,
    subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    background: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl<F: ResourceFactory> ResourcePool<F> {
    /// Creates a pool without subscribers.
    pub fn new(config: PoolConfig, factory: F) -> Self {
        Self::with_subscribers(config, factory, Vec::new())
    }

    /// Creates a pool that fans its events out to `subscribers` once started.
    pub fn with_subscribers(
        config: PoolConfig,
        factory: F,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(config.bus_capacity_clamped());
        let shared = Arc::new(PoolShared {
            idle: Mutex::new(VecDeque::with_capacity(config.capacity)),
            available: Semaphore::new(0),
            orphans: OrphanTracker::new(),
            token: CancellationToken::new(),
            lease_seq: AtomicU64::new(0),
            factory: Arc::new(factory),
            bus,
            config,
        });
        Self {
            shared,
            subscribers: Mutex::new(subscribers),
            background: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// The pool's event bus; subscribe for lifecycle events.
    pub fn bus(&self) -> &Bus {
        &self.shared.bus
    }

    /// The pool's configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Starts the pool: kicks off `capacity` resource creations
    /// (fire-and-forget), the subscriber fan-out, and the orphan sweep when
    /// enabled. Idempotent; returns immediately.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime (it spawns tasks).
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = &self.shared;
        let mut background = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let subscribers = std::mem::take(
            &mut *self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if !subscribers.is_empty() {
            let rx = shared.bus.subscribe();
            let set = SubscriberSet::new(subscribers);
            background.push(tokio::spawn(fan_out(rx, set, shared.token.clone())));
        }

        shared.bus.publish(shared.event(EventKind::PoolStarted));

        for _ in 0..shared.config.capacity {
            shared.spawn_replenish();
        }
        if shared.config.track_orphans {
            background.push(tokio::spawn(sweep_orphans(Arc::clone(shared))));
        }
    }

    /// Stops the pool: cancels in-flight creations, destroys idle resources
    /// (best-effort), and shuts down the sweep and subscriber workers.
    ///
    /// Leased resources stay with their holders; each is destroyed when its
    /// guard drops. Idempotent.
    pub async fn stop(&self) {
        if !self.started.load(Ordering::SeqCst) || self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = &self.shared;

        shared.bus.publish(shared.event(EventKind::PoolStopped));
        shared.token.cancel();
        shared.available.close();

        let drained: Vec<F::Resource> = {
            let mut idle = shared.idle.lock().unwrap_or_else(PoisonError::into_inner);
            idle.drain(..).collect()
        };
        for resource in drained {
            shared.destroy_resource(resource, "pool stopped");
        }

        let background = std::mem::take(
            &mut *self
                .background
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in background {
            let _ = handle.await;
        }
    }

    /// Checks a resource out of the pool, waiting up to `timeout`.
    ///
    /// When validation is enabled, an invalid resource is destroyed, a
    /// replacement creation is triggered, and acquisition continues within
    /// the remaining budget. Fails with [`PoolError::Exhausted`] when no
    /// valid resource became available in time (including when the pool was
    /// stopped while waiting).
    pub async fn acquire(&self, timeout: Duration) -> Result<PooledResource<F>, PoolError> {
        let shared = &self.shared;
        let deadline = time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(time::Instant::now());
            let permit = match time::timeout(remaining, shared.available.acquire()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_closed)) => return Err(PoolError::Exhausted { timeout }),
                Err(_elapsed) => return Err(PoolError::Exhausted { timeout }),
            };
            permit.forget();

            let popped = {
                let mut idle = shared.idle.lock().unwrap_or_else(PoisonError::into_inner);
                idle.pop_front()
            };
            // A concurrent stop() may drain the queue between permit and pop.
            let Some(mut resource) = popped else { continue };

            if shared.config.check_on_acquire && !shared.factory.validate(&mut resource).await {
                shared.bus.publish(shared.event(EventKind::ResourceInvalid));
                shared.destroy_resource(resource, "failed checkout validation");
                shared.spawn_replenish();
                continue;
            }

            let lease = shared.lease_seq.fetch_add(1, Ordering::Relaxed);
            if shared.config.track_orphans {
                shared.orphans.insert(lease);
            }
            shared
                .bus
                .publish(shared.event(EventKind::LeaseAcquired).with_lease(lease));
            return Ok(PooledResource::new(resource, lease, Arc::clone(shared)));
        }
    }
}

/// Delivers bus events to the subscriber set until the pool stops, then
/// drains the backlog and shuts the workers down.
async fn fan_out(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) {
    loop {
        select! {
            received = rx.recv() => match received {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            () = token.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => set.emit(&ev),
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    set.shutdown().await;
}

/// Periodically reports leases older than the configured threshold.
///
/// Reporting only: reclaiming a leased resource could race with a legitimate
/// long-running holder.
async fn sweep_orphans<F: ResourceFactory>(shared: Arc<PoolShared<F>>) {
    let mut ticker = time::interval(shared.config.sweep_interval);
    loop {
        select! {
            _ = ticker.tick() => {
                for report in shared.orphans.sweep(shared.config.orphan_after) {
                    shared.bus.publish(
                        shared
                            .event(EventKind::LeaseOrphaned)
                            .with_lease(report.lease)
                            .with_age(report.age)
                            .with_reason(report.acquired_from),
                    );
                }
            }
            () = shared.token.cancelled() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::BackoffPolicy;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicI64, AtomicU64};

    struct TestResource {
        id: u64,
    }

    #[derive(Default)]
    struct Stats {
        created: AtomicU64,
        destroyed: AtomicU64,
    }

    struct TestFactory {
        stats: Arc<Stats>,
        invalid: HashSet<u64>,
    }

    impl TestFactory {
        fn new(stats: Arc<Stats>) -> Self {
            Self {
                stats,
                invalid: HashSet::new(),
            }
        }

        fn with_invalid(stats: Arc<Stats>, invalid: impl IntoIterator<Item = u64>) -> Self {
            Self {
                stats,
                invalid: invalid.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl ResourceFactory for TestFactory {
        type Resource = TestResource;

        fn name(&self) -> &str {
            "test-resource"
        }

        async fn create(&self, _ctx: CancellationToken) -> Result<TestResource, RetryError> {
            let id = self.stats.created.fetch_add(1, Ordering::SeqCst);
            Ok(TestResource { id })
        }

        async fn validate(&self, resource: &mut TestResource) -> bool {
            !self.invalid.contains(&resource.id)
        }

        fn destroy(&self, resource: TestResource) {
            self.stats.destroyed.fetch_add(1, Ordering::SeqCst);
            drop(resource);
        }
    }

    fn small_config(capacity: usize) -> PoolConfig {
        PoolConfig {
            capacity,
            backoff: BackoffPolicy::fixed(Duration::from_millis(10)),
            ..PoolConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fills_to_capacity() {
        let stats = Arc::new(Stats::default());
        let pool = ResourcePool::new(small_config(2), TestFactory::new(Arc::clone(&stats)));
        pool.start();

        let a = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let b = pool.acquire(Duration::from_secs(1)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(stats.created.load(Ordering::SeqCst), 2);

        drop(a);
        drop(b);
        pool.stop().await;
        assert_eq!(stats.destroyed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_and_unblock_on_release() {
        let stats = Arc::new(Stats::default());
        let pool = Arc::new(ResourcePool::new(
            small_config(2),
            TestFactory::new(Arc::clone(&stats)),
        ));
        pool.start();

        let first = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let second = pool.acquire(Duration::from_secs(1)).await.unwrap();

        // Both slots leased: a third caller times out.
        let err = pool.acquire(Duration::from_millis(100)).await.unwrap_err();
        assert_eq!(
            err,
            PoolError::Exhausted {
                timeout: Duration::from_millis(100)
            }
        );

        // A pending caller is unblocked as soon as one lease is released.
        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.acquire(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        drop(first);

        let third = waiter.await.unwrap().unwrap();
        assert_eq!(stats.created.load(Ordering::SeqCst), 2, "no extra creation");

        drop(second);
        drop(third);
        pool.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_resource_replaced_transparently() {
        let stats = Arc::new(Stats::default());
        // Resource #0 will fail checkout validation.
        let factory = TestFactory::with_invalid(Arc::clone(&stats), [0]);
        let pool = ResourcePool::new(small_config(1), factory);
        let mut rx = pool.bus().subscribe();
        pool.start();

        let leased = pool.acquire(Duration::from_secs(5)).await.unwrap();
        assert_eq!(leased.id, 1, "caller sees the replacement, not the invalid one");
        assert_eq!(stats.created.load(Ordering::SeqCst), 2);
        assert_eq!(stats.destroyed.load(Ordering::SeqCst), 1);

        drop(leased);
        pool.stop().await;

        let mut saw_invalid = false;
        while let Ok(ev) = rx.try_recv() {
            saw_invalid |= ev.kind == EventKind::ResourceInvalid;
        }
        assert!(saw_invalid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_never_exceeded_under_churn() {
        let stats = Arc::new(Stats::default());
        let pool = Arc::new(ResourcePool::new(
            small_config(3),
            TestFactory::new(Arc::clone(&stats)),
        ));
        pool.start();

        let leased_now = Arc::new(AtomicI64::new(0));
        let peak = Arc::new(AtomicI64::new(0));

        let mut workers = Vec::new();
        for _ in 0..12 {
            let pool = Arc::clone(&pool);
            let leased_now = Arc::clone(&leased_now);
            let peak = Arc::clone(&peak);
            workers.push(tokio::spawn(async move {
                for _ in 0..10 {
                    let guard = pool.acquire(Duration::from_secs(5)).await.unwrap();
                    let cur = leased_now.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(cur, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    leased_now.fetch_sub(1, Ordering::SeqCst);
                    drop(guard);
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(stats.created.load(Ordering::SeqCst), 3);
        pool.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_times_out_when_factory_never_succeeds() {
        struct NeverFactory;
        #[async_trait]
        impl ResourceFactory for NeverFactory {
            type Resource = TestResource;

            async fn create(&self, _ctx: CancellationToken) -> Result<TestResource, RetryError> {
                Err(RetryError::failed("backend down"))
            }
        }

        let config = PoolConfig {
            capacity: 1,
            backoff: BackoffPolicy::fixed(Duration::from_secs(3600)),
            ..PoolConfig::default()
        };
        let pool = ResourcePool::new(config, NeverFactory);
        pool.start();

        let err = pool.acquire(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, PoolError::Exhausted { .. }));
        pool.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_after_stop_destroys_resource() {
        let stats = Arc::new(Stats::default());
        let pool = ResourcePool::new(small_config(1), TestFactory::new(Arc::clone(&stats)));
        pool.start();

        let leased = pool.acquire(Duration::from_secs(1)).await.unwrap();
        pool.stop().await;
        assert_eq!(stats.destroyed.load(Ordering::SeqCst), 0, "lease outlives stop");

        drop(leased);
        assert_eq!(stats.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lease_events_carry_matching_ids() {
        let stats = Arc::new(Stats::default());
        let pool = ResourcePool::new(small_config(1), TestFactory::new(Arc::clone(&stats)));
        let mut rx = pool.bus().subscribe();
        pool.start();

        let leased = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let lease_id = leased.lease_id();
        drop(leased);
        pool.stop().await;

        let mut acquired = None;
        let mut released = None;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::LeaseAcquired => acquired = ev.lease,
                EventKind::LeaseReleased => released = ev.lease,
                _ => {}
            }
        }
        assert_eq!(acquired, Some(lease_id));
        assert_eq!(released, Some(lease_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_orphan_sweep_reports_overdue_lease() {
        let stats = Arc::new(Stats::default());
        let config = PoolConfig {
            capacity: 1,
            backoff: BackoffPolicy::fixed(Duration::from_millis(10)),
            track_orphans: true,
            orphan_after: Duration::from_millis(50),
            sweep_interval: Duration::from_millis(20),
            ..PoolConfig::default()
        };
        let pool = ResourcePool::new(config, TestFactory::new(Arc::clone(&stats)));
        let mut rx = pool.bus().subscribe();
        pool.start();

        let leased = pool.acquire(Duration::from_secs(1)).await.unwrap();

        let orphaned = loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == EventKind::LeaseOrphaned {
                break ev;
            }
        };
        assert_eq!(orphaned.lease, Some(leased.lease_id()));
        assert!(orphaned.age_ms.unwrap() >= 50);
        assert!(orphaned.reason.is_some(), "carries the acquire-time stack");

        drop(leased);
        pool.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_receive_events_until_stop() {
        struct CountingSub {
            seen: Arc<AtomicU64>,
        }

        #[async_trait]
        impl Subscribe for CountingSub {
            async fn on_event(&self, _event: &Event) {
                self.seen.fetch_add(1, Ordering::SeqCst);
            }

            fn name(&self) -> &'static str {
                "counting"
            }
        }

        let seen = Arc::new(AtomicU64::new(0));
        let stats = Arc::new(Stats::default());
        let pool = ResourcePool::with_subscribers(
            small_config(1),
            TestFactory::new(Arc::clone(&stats)),
            vec![Arc::new(CountingSub {
                seen: Arc::clone(&seen),
            })],
        );
        pool.start();

        let leased = pool.acquire(Duration::from_secs(1)).await.unwrap();
        drop(leased);
        // stop() waits for the fan-out worker to drain its backlog.
        pool.stop().await;

        // At least: PoolStarted, AttemptStarted, RetrySucceeded, ResourceCreated,
        // LeaseAcquired, LeaseReleased, PoolStopped.
        assert!(seen.load(Ordering::SeqCst) >= 7);
    }
}
