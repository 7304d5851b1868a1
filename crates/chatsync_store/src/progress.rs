//! Completion tracking for bulk operations.
//!
//! A [`ProgressCounter`] is shared by N concurrent sub-operations (page
//! fetches, room populations) that each report success or failure once.
//! Exactly one reporter observes the counter crossing the finish line;
//! completion also fires over an explicit channel so a coordinating
//! caller can wait for it without polling.

use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

/// Final tally of a finished counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    /// Configured total number of sub-operations.
    pub total: usize,
    /// Sub-operations that reported success.
    pub succeeded: usize,
    /// Sub-operations that reported failure.
    pub failed: usize,
}

impl ProgressSummary {
    /// Returns true if every sub-operation succeeded.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Default)]
struct CounterInner {
    succeeded: usize,
    failed: usize,
    finished: bool,
    waiters: Vec<Sender<ProgressSummary>>,
}

/// Concurrency-safe completion counter for a bulk operation.
///
/// Both increment operations run under one critical section, so the
/// increment-and-check is atomic even when success and failure reports
/// race on the final slot. Completion latches: the counter finishes at
/// most once, and increments arriving after the latch are reported as
/// [`StoreError::CounterOverrun`] rather than silently absorbed.
///
/// A counter constructed with `total == 0` is finished immediately.
#[derive(Debug)]
pub struct ProgressCounter {
    total: usize,
    inner: Mutex<CounterInner>,
}

impl ProgressCounter {
    /// Creates a counter expecting `total` reports.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            inner: Mutex::new(CounterInner {
                finished: total == 0,
                ..CounterInner::default()
            }),
        }
    }

    /// Records one successful sub-operation.
    ///
    /// Returns `Ok(true)` for exactly the report that finishes the
    /// counter.
    pub fn increment_success(&self) -> StoreResult<bool> {
        self.increment(true)
    }

    /// Records one failed sub-operation.
    ///
    /// Returns `Ok(true)` for exactly the report that finishes the
    /// counter.
    pub fn increment_failure(&self) -> StoreResult<bool> {
        self.increment(false)
    }

    fn increment(&self, success: bool) -> StoreResult<bool> {
        let mut inner = self.inner.lock();

        if inner.finished {
            return Err(StoreError::CounterOverrun { total: self.total });
        }

        if success {
            inner.succeeded += 1;
        } else {
            inner.failed += 1;
        }

        if inner.succeeded + inner.failed == self.total {
            inner.finished = true;
            let summary = ProgressSummary {
                total: self.total,
                succeeded: inner.succeeded,
                failed: inner.failed,
            };
            for waiter in inner.waiters.drain(..) {
                let _ = waiter.send(summary);
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Returns a receiver that gets exactly one [`ProgressSummary`] when
    /// the counter finishes.
    ///
    /// If the counter is already finished (including the zero-total
    /// case), the summary is delivered before this call returns.
    pub fn finished_signal(&self) -> Receiver<ProgressSummary> {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.lock();
        if inner.finished {
            let _ = tx.send(ProgressSummary {
                total: self.total,
                succeeded: inner.succeeded,
                failed: inner.failed,
            });
        } else {
            inner.waiters.push(tx);
        }
        rx
    }

    /// Returns true once all reports have arrived.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished
    }

    /// Number of success reports so far.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.inner.lock().succeeded
    }

    /// Number of failure reports so far.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.inner.lock().failed
    }

    /// The configured total.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn finishes_on_last_report() {
        let counter = ProgressCounter::new(3);
        assert!(!counter.increment_success().unwrap());
        assert!(!counter.increment_failure().unwrap());
        assert!(counter.increment_success().unwrap());
        assert!(counter.is_finished());
        assert_eq!(counter.success_count(), 2);
        assert_eq!(counter.failure_count(), 1);
    }

    #[test]
    fn zero_total_is_finished_at_construction() {
        let counter = ProgressCounter::new(0);
        assert!(counter.is_finished());

        let rx = counter.finished_signal();
        let summary = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(summary.total, 0);
        assert!(summary.is_complete_success());
    }

    #[test]
    fn overrun_is_an_error() {
        let counter = ProgressCounter::new(1);
        assert!(counter.increment_success().unwrap());

        let err = counter.increment_failure().unwrap_err();
        assert!(matches!(err, StoreError::CounterOverrun { total: 1 }));

        // The latch held: counts are unchanged.
        assert_eq!(counter.success_count(), 1);
        assert_eq!(counter.failure_count(), 0);
    }

    #[test]
    fn finished_signal_fires_once() {
        let counter = ProgressCounter::new(2);
        let rx = counter.finished_signal();

        counter.increment_failure().unwrap();
        assert!(rx.try_recv().is_err());

        counter.increment_success().unwrap();
        let summary = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_complete_success());

        // Channel is drained after the single delivery.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn exactly_one_finisher_under_concurrency() {
        let counter = Arc::new(ProgressCounter::new(5));
        let mut handles = Vec::new();

        for i in 0..5 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                if i < 3 {
                    counter.increment_success().unwrap()
                } else {
                    counter.increment_failure().unwrap()
                }
            }));
        }

        let finishes: usize = handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();
        assert_eq!(finishes, 1);
        assert!(counter.is_finished());
        assert_eq!(counter.success_count(), 3);
        assert_eq!(counter.failure_count(), 2);
    }
}
