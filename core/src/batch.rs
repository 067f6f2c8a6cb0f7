//! Sequential, paced batch execution with per-item failure isolation.
//!
//! RULES:
//!   - One item at a time. Each call finishes before the next starts.
//!     The backing store rate-limits and parallel writes get throttled.
//!   - A fixed delay separates consecutive items (none after the last).
//!   - A failed item is recorded and the run moves on.
//!   - Cancellation is checked between items only; an item in flight
//!     always completes. A cancelled run returns what it has so far.

use crate::error::EngineError;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// Shared cancellation switch. Clone it and hand it to whoever may stop the run.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

    pub fn reset(&self) { self.0.store(false, Ordering::SeqCst); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

#[derive(Debug)]
pub struct BatchFailure<T> {
    pub item:  T,
    pub error: EngineError,
}

#[derive(Debug)]
pub struct BatchOutcome<T, R> {
    pub total:     usize,
    pub succeeded: Vec<R>,
    pub failed:    Vec<BatchFailure<T>>,
    /// True if the run stopped early on the cancel flag.
    pub cancelled: bool,
}

impl<T, R> BatchOutcome<T, R> {
    /// Items actually attempted (fewer than `total` after cancellation).
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

#[derive(Debug, Clone)]
pub struct BatchExecutor {
    delay:  Duration,
    cancel: CancelFlag,
}

impl BatchExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay, cancel: CancelFlag::new() }
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run `op` over `items` strictly in order.
    pub fn run_sequential<T, R, F>(&self, items: Vec<T>, mut op: F) -> BatchOutcome<T, R>
    where
        F: FnMut(&T) -> Result<R, EngineError>,
    {
        let total = items.len();
        let mut outcome = BatchOutcome {
            total,
            succeeded: Vec::new(),
            failed:    Vec::new(),
            cancelled: false,
        };

        for (index, item) in items.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("batch cancelled after {index}/{total} item(s)");
                outcome.cancelled = true;
                break;
            }
            if index > 0 && !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            match op(&item) {
                Ok(result) => outcome.succeeded.push(result),
                Err(error) => {
                    log::warn!("batch item {} of {total} failed: {error}", index + 1);
                    outcome.failed.push(BatchFailure { item, error });
                }
            }
        }

        outcome
    }
}
