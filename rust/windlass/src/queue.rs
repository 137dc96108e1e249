//! A bounded, blocking multi-producer, multi-consumer task queue.
//!
//! The queue is the hand-off point between task submitters and workers. It
//! holds at most `capacity` items in strict FIFO order, blocks producers
//! while full and consumers while empty, and is shut down with an explicit,
//! idempotent [`close`](TaskQueue::close): after closing, submission fails
//! immediately, items already buffered can still be drained, and consumers
//! observe exhaustion (`None`) once the buffer runs dry.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use windlass_common::error::Error;

/// An error returned from the blocking and non-blocking submit methods.
///
/// Both variants hand the rejected item back to the caller.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError<T> {
    /// The queue has been closed; the item will never be accepted.
    Closed(T),
    /// The queue is at capacity (returned by the non-blocking and timed
    /// variants only).
    Full(T),
}

impl<T> SubmitError<T> {
    /// Recovers the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            SubmitError::Closed(item) | SubmitError::Full(item) => item,
        }
    }
}

impl<T> std::fmt::Display for SubmitError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Closed(_) => write!(f, "queue is closed"),
            SubmitError::Full(_) => write!(f, "queue is full"),
        }
    }
}

impl<T: std::fmt::Debug> std::error::Error for SubmitError<T> {}

impl<T> From<SubmitError<T>> for Error {
    fn from(e: SubmitError<T>) -> Error {
        match e {
            SubmitError::Closed(_) => Error::queue_closed(),
            SubmitError::Full(_) => Error::queue_full(),
        }
    }
}

/// An error returned from [`TaskQueue::try_next`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryNextError {
    /// The queue is empty but still open; items may yet arrive.
    Empty,
    /// The queue is closed and fully drained; no item will ever arrive.
    Closed,
}

impl std::fmt::Display for TryNextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TryNextError::Empty => write!(f, "queue is empty"),
            TryNextError::Closed => write!(f, "queue is closed and drained"),
        }
    }
}

impl std::error::Error for TryNextError {}

/// An error returned from [`TaskQueue::next_timeout`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NextTimeoutError {
    /// No item arrived within the given duration.
    TimedOut,
    /// The queue is closed and fully drained; no item will ever arrive.
    Closed,
}

impl std::fmt::Display for NextTimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextTimeoutError::TimedOut => write!(f, "timed out waiting for an item"),
            NextTimeoutError::Closed => write!(f, "queue is closed and drained"),
        }
    }
}

impl std::error::Error for NextTimeoutError {}

/// A bounded, blocking MPMC queue with explicit close-and-drain shutdown.
///
/// Cloning the queue does not create a new queue: clones are handles onto
/// the same buffer and can be moved freely across producer and consumer
/// threads. All methods take `&self` and are safe to call concurrently.
pub struct TaskQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        TaskQueue {
            inner: self.inner.clone(),
        }
    }
}

impl<T> TaskQueue<T> {
    /// Creates a new queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero: a rendezvous queue is not supported.
    pub fn new(capacity: usize) -> TaskQueue<T> {
        assert!(capacity >= 1, "TaskQueue does not support zero capacity");

        let state = QueueState {
            items: VecDeque::with_capacity(capacity),
            capacity,
            closed: false,
        };

        TaskQueue {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
        }
    }

    /// Submits an item, blocking while the queue is full.
    ///
    /// - If the queue has free capacity, the item is appended and one
    ///   waiting consumer is woken.
    /// - If the queue is full, the calling thread blocks until a consumer
    ///   makes space or the queue is closed.
    /// - If the queue is closed (before or during the wait), the item is
    ///   handed back as `Err(SubmitError::Closed(item))`.
    pub fn submit(&self, item: T) -> Result<(), SubmitError<T>> {
        let mut state = self.inner.state.lock().unwrap();

        loop {
            if state.closed {
                return Err(SubmitError::Closed(item));
            }

            if state.items.len() >= state.capacity {
                // Wait for a consumer to make space, then re-check everything.
                state = self.inner.not_full.wait(state).unwrap();
                continue;
            }

            break;
        }

        state.items.push_back(item);

        // Drop the lock before notifying to reduce contention on wakeup.
        drop(state);

        self.inner.not_empty.notify_one();

        Ok(())
    }

    /// Submits an item without blocking.
    ///
    /// Fails with `SubmitError::Full(item)` when the queue is at capacity
    /// and `SubmitError::Closed(item)` when it has been closed.
    pub fn try_submit(&self, item: T) -> Result<(), SubmitError<T>> {
        let mut state = self.inner.state.lock().unwrap();

        if state.closed {
            return Err(SubmitError::Closed(item));
        }

        if state.items.len() >= state.capacity {
            return Err(SubmitError::Full(item));
        }

        state.items.push_back(item);
        drop(state);
        self.inner.not_empty.notify_one();

        Ok(())
    }

    /// Submits an item, blocking at most `timeout` while the queue is full.
    ///
    /// Fails with `SubmitError::Full(item)` if no space opened up within the
    /// timeout, and with `SubmitError::Closed(item)` if the queue was closed
    /// before space became available.
    pub fn submit_timeout(&self, item: T, timeout: Duration) -> Result<(), SubmitError<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock().unwrap();

        loop {
            if state.closed {
                return Err(SubmitError::Closed(item));
            }

            if state.items.len() < state.capacity {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SubmitError::Full(item));
            }

            let (guard, _) = self
                .inner
                .not_full
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }

        state.items.push_back(item);
        drop(state);
        self.inner.not_empty.notify_one();

        Ok(())
    }

    /// Takes the next item, blocking while the queue is empty.
    ///
    /// Returns `None` only when the queue is closed **and** drained: items
    /// buffered before the close are always delivered first. `None` is the
    /// terminal exhaustion signal; every subsequent call also returns `None`.
    pub fn next(&self) -> Option<T> {
        let mut state = self.inner.state.lock().unwrap();

        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                // One producer slot opened up.
                self.inner.not_full.notify_one();
                return Some(item);
            }

            if state.closed {
                return None;
            }

            // Empty but still open: wait for a producer, then re-check.
            state = self.inner.not_empty.wait(state).unwrap();
        }
    }

    /// Takes the next item without blocking.
    ///
    /// Distinguishes a transiently empty queue (`TryNextError::Empty`) from
    /// a closed-and-drained one (`TryNextError::Closed`).
    pub fn try_next(&self) -> Result<T, TryNextError> {
        let mut state = self.inner.state.lock().unwrap();

        if let Some(item) = state.items.pop_front() {
            drop(state);
            self.inner.not_full.notify_one();
            return Ok(item);
        }

        if state.closed {
            return Err(TryNextError::Closed);
        }

        Err(TryNextError::Empty)
    }

    /// Takes the next item, blocking at most `timeout` while the queue is
    /// empty.
    pub fn next_timeout(&self, timeout: Duration) -> Result<T, NextTimeoutError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock().unwrap();

        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.inner.not_full.notify_one();
                return Ok(item);
            }

            if state.closed {
                return Err(NextTimeoutError::Closed);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(NextTimeoutError::TimedOut);
            }

            let (guard, _) = self
                .inner
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
    }

    /// Closes the queue.
    ///
    /// Closing is terminal and idempotent: the first call flips the queue
    /// into the closed state and wakes every blocked producer and consumer;
    /// repeated calls have no further effect. Items already buffered remain
    /// available to [`next`](Self::next) until drained.
    pub fn close(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);

        // Producers must observe Closed, consumers must re-check for drain.
        self.inner.not_full.notify_all();
        self.inner.not_empty.notify_all();
    }

    /// Returns whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().unwrap().closed
    }

    /// Returns the number of currently buffered items.
    ///
    /// The value is inherently stale: another thread may submit or take an
    /// item between the measurement and any action based on it. Useful for
    /// diagnostics, never for synchronization.
    pub fn len(&self) -> usize {
        self.inner.state.lock().unwrap().items.len()
    }

    /// Returns whether the buffer is currently empty (same staleness caveat
    /// as [`len`](Self::len)).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed capacity the queue was created with.
    pub fn capacity(&self) -> usize {
        self.inner.state.lock().unwrap().capacity
    }
}

/// The queue state protected by the mutex.
struct QueueState<T> {
    items: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

/// The shared core of the queue: state plus the two wait conditions.
struct Inner<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar, // Signals consumers that an item has been added.
    not_full: Condvar,  // Signals producers that space (or close) happened.
}
