//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [attempt] source=db-conn attempt=0
//! [failed] source=db-conn err="connection refused" attempt=0
//! [backoff] source=db-conn delay_ms=200 after_attempt=0 err="connection refused"
//! [exhausted] source=db-conn attempt=9 err="connection refused"
//! [created] source=db-conn
//! [lease-orphaned] source=db-conn lease=7 age_ms=61000
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::AttemptStarted => {
                if let (Some(source), Some(att)) = (&e.source, e.attempt) {
                    println!("[attempt] source={source} attempt={att}");
                }
            }
            EventKind::AttemptFailed => {
                println!(
                    "[failed] source={:?} err={:?} attempt={:?}",
                    e.source, e.reason, e.attempt
                );
            }
            EventKind::BackoffScheduled => {
                println!(
                    "[backoff] source={:?} delay_ms={:?} after_attempt={:?} err={:?}",
                    e.source, e.delay_ms, e.attempt, e.reason
                );
            }
            EventKind::RetrySucceeded => {
                println!("[succeeded] source={:?} attempt={:?}", e.source, e.attempt);
            }
            EventKind::RetryExhausted => {
                println!(
                    "[exhausted] source={:?} attempt={:?} err={:?}",
                    e.source, e.attempt, e.reason
                );
            }
            EventKind::RetryAborted => {
                println!(
                    "[aborted] source={:?} attempt={:?} err={:?}",
                    e.source, e.attempt, e.reason
                );
            }
            EventKind::RetryCanceled => {
                println!("[canceled] source={:?}", e.source);
            }
            EventKind::PoolStarted => {
                println!("[pool-started] source={:?}", e.source);
            }
            EventKind::PoolStopped => {
                println!("[pool-stopped] source={:?}", e.source);
            }
            EventKind::ResourceCreated => {
                println!("[created] source={:?}", e.source);
            }
            EventKind::ResourceInvalid => {
                println!("[invalid] source={:?}", e.source);
            }
            EventKind::ResourceDestroyed => {
                println!("[destroyed] source={:?} reason={:?}", e.source, e.reason);
            }
            EventKind::ReplenishAbandoned => {
                println!("[replenish-abandoned] source={:?} err={:?}", e.source, e.reason);
            }
            EventKind::LeaseAcquired => {
                println!("[lease] source={:?} lease={:?}", e.source, e.lease);
            }
            EventKind::LeaseReleased => {
                println!("[release] source={:?} lease={:?}", e.source, e.lease);
            }
            EventKind::LeaseOrphaned => {
                println!(
                    "[lease-orphaned] source={:?} lease={:?} age_ms={:?}",
                    e.source, e.lease, e.age_ms
                );
            }
            EventKind::ReleaseUntracked => {
                println!(
                    "[release-untracked] source={:?} lease={:?}",
                    e.source, e.lease
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
