//! # RetryTask: drives repeated attempts of one operation.
//!
//! Spawns a driver onto the tokio runtime that invokes an [`Operation`]
//! until it succeeds, the [`BackoffPolicy`] gives up, a non-retryable error
//! appears, or the task is cancelled. The caller gets a [`RetryHandle`]
//! immediately; no attempt ever runs on the caller's thread and no thread is
//! blocked for a backoff duration.
//!
//! ## Attempt flow
//! ```text
//! loop {
//!   ├─► publish AttemptStarted{ attempt }
//!   ├─► operation.run(child_token)        (raced against cancellation)
//!   │       │
//!   │       ├─ Ok(v), retry_if rejects v ─► synthetic Rejected error
//!   │       ├─ Ok(v)                     ─► publish RetrySucceeded, done
//!   │       └─ Err(e)
//!   ├─► publish AttemptFailed{ err }
//!   ├─► on_error observer (panics swallowed)
//!   ├─► non-retryable / give_up_when     ─► publish RetryAborted, done
//!   └─► backoff.decide(attempt)
//!        ├─► GiveUp  ─► publish RetryExhausted, done
//!        └─► Wait(d) ─► publish BackoffScheduled, cancellable sleep(d)
//! }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially**; attempt `n + 1` is scheduled only after
//!   the driver observed attempt `n` fail.
//! - The attempt counter is zero-based and **never resets**.
//! - The outcome is written **exactly once** (oneshot channel); a result
//!   arriving after cancellation is discarded.
//! - A panicking observer or backoff policy resolves the handle with the
//!   **original** attempt error, never the secondary failure.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::{select, sync::oneshot, time};

use crate::error::RetryError;
use crate::events::{Event, EventKind};
use crate::policies::BackoffDecision;
use crate::retry::config::RetryConfig;
use crate::retry::handle::RetryHandle;
use crate::retry::operation::OperationRef;

/// Entry point for spawning retry tasks.
///
/// Stateless: each [`spawn`](RetryTask::spawn) creates an independent driver
/// with its own attempt counter and outcome channel. Any number of tasks may
/// run in parallel; they share nothing.
pub struct RetryTask;

impl RetryTask {
    /// Spawns a retry driver for `operation` and returns its handle.
    ///
    /// Attempt 0 begins immediately on the ambient tokio runtime; this
    /// function does not wait for it.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime (it spawns a task).
    ///
    /// # Example
    /// ```rust
    /// use poolvisor::{BackoffPolicy, OperationFn, RetryConfig, RetryError, RetryTask};
    /// use std::time::Duration;
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let op = OperationFn::arc("answer", |_ctx: CancellationToken| async {
    ///     Ok::<_, RetryError>(42)
    /// });
    /// let cfg = RetryConfig::with_backoff(BackoffPolicy::fixed(Duration::from_millis(10)));
    ///
    /// let handle = RetryTask::spawn(op, cfg);
    /// assert_eq!(handle.join().await, Ok(42));
    /// # }
    /// ```
    pub fn spawn<T: Send + 'static>(
        operation: OperationRef<T>,
        config: RetryConfig<T>,
    ) -> RetryHandle<T> {
        let token = config.token.clone();
        let done = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();

        let driver = Driver {
            operation,
            config,
            done: Arc::clone(&done),
        };
        tokio::spawn(driver.run(tx));

        RetryHandle::new(token, done, rx)
    }
}

/// The spawned half of a retry task: owns the attempt loop.
struct Driver<T> {
    operation: OperationRef<T>,
    config: RetryConfig<T>,
    done: Arc<AtomicBool>,
}

impl<T: Send + 'static> Driver<T> {
    async fn run(self, tx: oneshot::Sender<Result<T, RetryError>>) {
        let token = self.config.token.clone();
        let mut attempt: u32 = 0;

        let outcome = loop {
            if token.is_cancelled() {
                break self.canceled(attempt);
            }

            self.publish(
                Event::new(EventKind::AttemptStarted)
                    .with_source(self.operation.label())
                    .with_attempt(attempt),
            );

            let child = token.child_token();
            let raced = select! {
                res = self.operation.run(child) => Some(res),
                () = token.cancelled() => None,
            };

            // Discard results that lost the race against cancellation.
            let result = match raced {
                Some(res) if !token.is_cancelled() => res,
                _ => break self.canceled(attempt),
            };

            let err = match result {
                Ok(value) => match &self.config.retry_if {
                    Some(rejects) if rejects(&value) => {
                        RetryError::rejected("produced value rejected by predicate")
                    }
                    _ => {
                        self.publish(
                            Event::new(EventKind::RetrySucceeded)
                                .with_source(self.operation.label())
                                .with_attempt(attempt),
                        );
                        break Ok(value);
                    }
                },
                Err(err) => err,
            };

            self.publish(
                Event::new(EventKind::AttemptFailed)
                    .with_source(self.operation.label())
                    .with_attempt(attempt)
                    .with_reason(err.to_string()),
            );

            if let Some(observer) = &self.config.on_error {
                let _ = panic::catch_unwind(AssertUnwindSafe(|| observer(attempt, &err)));
            }

            let stop_early = !err.is_retryable()
                || match &self.config.give_up_when {
                    Some(give_up) => {
                        panic::catch_unwind(AssertUnwindSafe(|| give_up(&err))).unwrap_or(true)
                    }
                    None => false,
                };
            if stop_early {
                self.publish(
                    Event::new(EventKind::RetryAborted)
                        .with_source(self.operation.label())
                        .with_attempt(attempt)
                        .with_reason(err.to_string()),
                );
                break Err(err);
            }

            let decision =
                panic::catch_unwind(AssertUnwindSafe(|| self.config.backoff.decide(attempt)))
                    .unwrap_or(BackoffDecision::GiveUp);

            match decision {
                BackoffDecision::GiveUp => {
                    self.publish(
                        Event::new(EventKind::RetryExhausted)
                            .with_source(self.operation.label())
                            .with_attempt(attempt)
                            .with_reason(err.to_string()),
                    );
                    break Err(err);
                }
                BackoffDecision::Wait(delay) => {
                    self.publish(
                        Event::new(EventKind::BackoffScheduled)
                            .with_source(self.operation.label())
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_reason(err.to_string()),
                    );

                    let sleep = time::sleep(delay);
                    tokio::pin!(sleep);
                    select! {
                        () = &mut sleep => {}
                        () = token.cancelled() => break self.canceled(attempt),
                    }
                }
            }

            attempt += 1;
        };

        self.done.store(true, Ordering::Release);
        let _ = tx.send(outcome);
    }

    /// Publishes the cancellation event and produces the terminal error.
    fn canceled(&self, attempt: u32) -> Result<T, RetryError> {
        self.publish(
            Event::new(EventKind::RetryCanceled)
                .with_source(self.operation.label())
                .with_attempt(attempt),
        );
        Err(RetryError::Canceled)
    }

    fn publish(&self, ev: Event) {
        if let Some(bus) = &self.config.bus {
            bus.publish(ev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use crate::policies::BackoffPolicy;
    use crate::retry::operation::OperationFn;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Operation that fails `fail_times` times, then returns the attempt index.
    fn flaky(attempts: Arc<AtomicU32>, fail_times: u32) -> OperationRef<u32> {
        OperationFn::arc("flaky", move |_ctx: CancellationToken| {
            let attempts = Arc::clone(&attempts);
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < fail_times {
                    Err(RetryError::failed(format!("boom #{n}")))
                } else {
                    Ok(n)
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_four_failures_then_success_waits_four_times() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = flaky(Arc::clone(&attempts), 4);
        let cfg = RetryConfig::with_backoff(BackoffPolicy::fixed(Duration::from_millis(50)));

        let started = time::Instant::now();
        let value = RetryTask::spawn(op, cfg).join().await;

        assert_eq!(value, Ok(4));
        assert_eq!(attempts.load(Ordering::SeqCst), 5, "exactly 5 attempts");
        assert!(
            started.elapsed() >= Duration::from_millis(200),
            "four 50ms waits must elapse, got {:?}",
            started.elapsed()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_exactly_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = flaky(Arc::clone(&attempts), u32::MAX);
        let cfg = RetryConfig::with_backoff(
            BackoffPolicy::fixed(Duration::from_millis(1)).with_max_attempts(3),
        );

        let err = RetryTask::spawn(op, cfg).join().await.unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(err, RetryError::failed("boom #2"), "last attempt's error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let op = OperationFn::arc("doomed", move |_ctx: CancellationToken| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(RetryError::fatal("bad credentials"))
            }
        });
        let cfg = RetryConfig::with_backoff(BackoffPolicy::fixed(Duration::from_millis(1)));

        let err = RetryTask::spawn(op, cfg).join().await.unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(err, RetryError::fatal("bad credentials"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_give_up_when_predicate_stops_early() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let op = OperationFn::arc("denied", move |_ctx: CancellationToken| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(RetryError::failed("auth denied"))
            }
        });

        let mut cfg =
            RetryConfig::with_backoff(BackoffPolicy::fixed(Duration::from_millis(1)));
        cfg.give_up_when = Some(Arc::new(|e: &RetryError| {
            matches!(e, RetryError::Failed { reason } if reason.contains("auth"))
        }));

        let err = RetryTask::spawn(op, cfg).join().await.unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1, "transient but flagged");
        assert_eq!(err, RetryError::failed("auth denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_if_forces_retry_until_exhaustion() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        // Never fails, yet never acceptable.
        let op = OperationFn::arc("hollow", move |_ctx: CancellationToken| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, RetryError>(0)
            }
        });

        let mut cfg = RetryConfig::with_backoff(
            BackoffPolicy::fixed(Duration::from_millis(1)).with_max_attempts(4),
        );
        cfg.retry_if = Some(Arc::new(|_v: &u32| true));

        let err = RetryTask::spawn(op, cfg).join().await.unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert!(matches!(err, RetryError::Rejected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_value_not_surfaced_after_later_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let op = OperationFn::arc("warmup", move |_ctx: CancellationToken| {
            let counter = Arc::clone(&counter);
            async move { Ok::<u32, RetryError>(counter.fetch_add(1, Ordering::SeqCst)) }
        });

        let mut cfg =
            RetryConfig::with_backoff(BackoffPolicy::fixed(Duration::from_millis(1)));
        // Reject the zeroth value only.
        cfg.retry_if = Some(Arc::new(|v: &u32| *v == 0));

        let value = RetryTask::spawn(op, cfg).join().await;
        assert_eq!(value, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_further_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = flaky(Arc::clone(&attempts), u32::MAX);
        let cfg = RetryConfig::with_backoff(BackoffPolicy::fixed(Duration::from_secs(3600)));

        let handle = RetryTask::spawn(op, cfg);
        while attempts.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        handle.cancel();
        let err = handle.join().await.unwrap_err();

        assert_eq!(err, RetryError::Canceled);
        assert_eq!(
            attempts.load(Ordering::SeqCst),
            1,
            "no attempt may run after cancellation"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_panic_preserves_original_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = flaky(Arc::clone(&attempts), u32::MAX);

        let mut cfg = RetryConfig::with_backoff(
            BackoffPolicy::fixed(Duration::from_millis(1)).with_max_attempts(2),
        );
        cfg.on_error = Some(Arc::new(|_, _| panic!("observer exploded")));

        let err = RetryTask::spawn(op, cfg).join().await.unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 2, "panic swallowed, retry went on");
        assert_eq!(err, RetryError::failed("boom #1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_called_once_per_failed_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = flaky(Arc::clone(&attempts), 2);

        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let mut cfg =
            RetryConfig::with_backoff(BackoffPolicy::fixed(Duration::from_millis(1)));
        cfg.on_error = Some(Arc::new(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let value = RetryTask::spawn(op, cfg).join().await;

        assert_eq!(value, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_record_every_attempt() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();

        let attempts = Arc::new(AtomicU32::new(0));
        let op = flaky(Arc::clone(&attempts), u32::MAX);
        let mut cfg = RetryConfig::with_backoff(
            BackoffPolicy::fixed(Duration::from_millis(1)).with_max_attempts(3),
        );
        cfg.bus = Some(bus.clone());

        let _ = RetryTask::spawn(op, cfg).join().await;

        let mut started = 0;
        let mut terminal = None;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::AttemptStarted => started += 1,
                EventKind::RetryExhausted | EventKind::RetryAborted => terminal = Some(ev.kind),
                _ => {}
            }
        }
        assert_eq!(started, 3);
        assert_eq!(terminal, Some(EventKind::RetryExhausted));
    }
}
