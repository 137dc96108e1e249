//! Outstanding-work accounting for fan-out/fan-in coordination.
//!
//! A [`CompletionTracker`] counts work that has been handed out but not yet
//! finished: [`add`](CompletionTracker::add) before dispatch,
//! [`done`](CompletionTracker::done) on completion (success and failure
//! alike), [`wait`](CompletionTracker::wait) to block until the count
//! returns to zero. The count can never go negative: a `done` call with
//! nothing outstanding is a bookkeeping bug in the caller and panics
//! immediately rather than corrupting every waiter downstream.
//!
//! For panic-safe accounting, [`guard`](CompletionTracker::guard) returns a
//! handle that registers one unit on creation and completes it on drop,
//! however the scope exits.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use windlass_common::{Result, error::Error};

/// Counts outstanding work units; waiters block until the count is zero.
///
/// Clones share the same count and can be handed to any number of
/// dispatching and completing threads.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    count: Mutex<usize>,
    zero: Condvar,
}

impl CompletionTracker {
    pub fn new() -> CompletionTracker {
        CompletionTracker {
            inner: Arc::new(TrackerInner {
                count: Mutex::new(0),
                zero: Condvar::new(),
            }),
        }
    }

    /// Registers `n` additional outstanding work units.
    pub fn add(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut count = self.inner.count.lock().unwrap();
        *count += n;
    }

    /// Marks one outstanding work unit as finished.
    ///
    /// # Panics
    ///
    /// Panics if nothing is outstanding: cumulative `done` calls may never
    /// exceed cumulative `add`s.
    pub fn done(&self) {
        let mut count = self.inner.count.lock().unwrap();
        if *count == 0 {
            drop(count);
            panic!("{}", Error::negative_counter());
        }
        *count -= 1;
        if *count == 0 {
            drop(count);
            self.inner.zero.notify_all();
        }
    }

    /// Blocks until every registered work unit has been marked done.
    ///
    /// Returns immediately if nothing is outstanding. With the no-timeout
    /// form the caller owns the guarantee that matching `done` calls will
    /// come; a lost `done` blocks this forever by design.
    pub fn wait(&self) {
        let count = self.inner.count.lock().unwrap();
        let _count = self.inner.zero.wait_while(count, |c| *c > 0).unwrap();
    }

    /// Blocks until the count reaches zero or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        let count = self.inner.count.lock().unwrap();
        let (count, wait_result) = self
            .inner
            .zero
            .wait_timeout_while(count, timeout, |c| *c > 0)
            .unwrap();
        if wait_result.timed_out() && *count > 0 {
            Err(Error::deadline_exceeded(timeout))
        } else {
            Ok(())
        }
    }

    /// Returns the current number of outstanding work units (stale the
    /// moment it is read; diagnostic only).
    pub fn outstanding(&self) -> usize {
        *self.inner.count.lock().unwrap()
    }

    /// Registers one work unit and returns a handle that completes it on
    /// drop.
    ///
    /// The drop runs during unwinding too, so a panicking work item still
    /// balances its accounting.
    pub fn guard(&self) -> CompletionGuard {
        self.add(1);
        CompletionGuard {
            tracker: self.clone(),
        }
    }
}

/// Completes one outstanding work unit when dropped.
#[derive(Debug)]
pub struct CompletionGuard {
    tracker: CompletionTracker,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.tracker.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn test_wait_returns_immediately_when_nothing_outstanding() {
        let tracker = CompletionTracker::new();
        tracker.wait();
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_add_done_wait_cycle() {
        let tracker = CompletionTracker::new();
        tracker.add(3);
        assert_eq!(tracker.outstanding(), 3);
        tracker.done();
        tracker.done();
        tracker.done();
        tracker.wait();
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_wait_blocks_until_last_done() {
        let tracker = CompletionTracker::new();
        tracker.add(2);

        let woke_early = Arc::new(AtomicBool::new(false));

        let t = tracker.clone();
        let woke = woke_early.clone();
        let waiter = thread::spawn(move || {
            t.wait();
            woke.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(30));
        tracker.done();

        // One unit still outstanding: the waiter must still be blocked.
        thread::sleep(Duration::from_millis(30));
        assert!(!woke_early.load(Ordering::SeqCst));

        tracker.done();
        waiter.join().unwrap();
        assert!(woke_early.load(Ordering::SeqCst));
    }

    #[test]
    fn test_done_without_add_panics() {
        let tracker = CompletionTracker::new();
        let result = std::panic::catch_unwind(|| tracker.done());
        assert!(result.is_err());
    }

    #[test]
    fn test_excess_done_panics() {
        let tracker = CompletionTracker::new();
        tracker.add(1);
        tracker.done();
        let result = std::panic::catch_unwind(|| tracker.done());
        assert!(result.is_err());
    }

    #[test]
    fn test_wait_timeout_expires() {
        let tracker = CompletionTracker::new();
        tracker.add(1);
        let err = tracker
            .wait_timeout(Duration::from_millis(30))
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            windlass_common::error::ErrorKind::DeadlineExceeded { .. }
        ));
        tracker.done();
        tracker.wait_timeout(Duration::from_millis(30)).unwrap();
    }

    #[test]
    fn test_guard_completes_on_drop() {
        let tracker = CompletionTracker::new();
        {
            let _guard = tracker.guard();
            assert_eq!(tracker.outstanding(), 1);
        }
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_guard_completes_on_panic() {
        let tracker = CompletionTracker::new();
        let t = tracker.clone();
        let result = thread::spawn(move || {
            let _guard = t.guard();
            panic!("work item died");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(tracker.outstanding(), 0);
        tracker.wait();
    }

    #[test]
    fn test_many_workers_one_waiter() {
        const WORKERS: usize = 8;

        let tracker = CompletionTracker::new();
        tracker.add(WORKERS);

        thread::scope(|s| {
            for _ in 0..WORKERS {
                let t = tracker.clone();
                s.spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    t.done();
                });
            }
            tracker.wait();
            assert_eq!(tracker.outstanding(), 0);
        });
    }
}
