//! Waiting on multiple readiness sources with a deadline.
//!
//! [`select`] polls a set of [`EventSource`]s until one produces a value,
//! every source reports closed, or the timeout expires. Claiming is atomic
//! with selection: a source either hands the value out with the readiness
//! decision or reports nothing, so a selected value can never be lost or
//! observed by two selectors.
//!
//! When more than one source is ready in the same round, which one wins is
//! deliberately unspecified. The polling order is re-shuffled every round,
//! so callers cannot come to depend on an accidental priority.
//!
//! The wait is a poll loop with exponential backoff capped at one
//! millisecond, bounded by the deadline. An immediately ready source
//! returns without sleeping at all.

use std::thread;
use std::time::{Duration, Instant};

use windlass_common::{Result, error::Error};

use crate::cancel::CancelToken;
use crate::queue::{TaskQueue, TryNextError};

/// What a source reports when asked for an event.
#[derive(Debug, PartialEq, Eq)]
pub enum SourceState<V> {
    /// An event was ready; it has been claimed and rides out here.
    Ready(V),
    /// Nothing ready right now, but events may still arrive.
    Pending,
    /// No event will ever arrive from this source again.
    Closed,
}

/// A pollable readiness source.
///
/// `try_claim` must be non-blocking and must hand an event out at most
/// once: returning `SourceState::Ready(v)` transfers ownership of `v` to
/// the caller. After reporting `Closed`, a source must keep reporting
/// `Closed`.
pub trait EventSource<V> {
    fn try_claim(&self) -> SourceState<V>;
}

/// The successful outcome of a [`select`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum Selected<V> {
    /// The source at index `source` produced `value`.
    Event { source: usize, value: V },
    /// Every source reported closed; nothing will ever become ready.
    Exhausted,
}

/// Waits up to `timeout` for any source to produce an event.
///
/// - Returns [`Selected::Event`] with the claimed value and the index of
///   the source that produced it.
/// - Returns [`Selected::Exhausted`] when every source is closed (an empty
///   source list counts as exhausted).
/// - Fails with [`DeadlineExceeded`] when the timeout passes with at least
///   one source still pending.
///
/// [`DeadlineExceeded`]: windlass_common::error::ErrorKind::DeadlineExceeded
pub fn select<V>(sources: &[&dyn EventSource<V>], timeout: Duration) -> Result<Selected<V>> {
    select_deadline(sources, Instant::now() + timeout)
}

/// [`select`] with an absolute deadline, for composing with an outer time
/// budget.
pub fn select_deadline<V>(sources: &[&dyn EventSource<V>], deadline: Instant) -> Result<Selected<V>> {
    if sources.is_empty() {
        return Ok(Selected::Exhausted);
    }

    let timeout = deadline.saturating_duration_since(Instant::now());

    let mut indices: Vec<usize> = (0..sources.len()).collect();
    let mut backoff = Duration::from_nanos(100);
    let max_backoff = Duration::from_millis(1);

    loop {
        // Fresh visit order every round: ties between simultaneously ready
        // sources land on a different winner from round to round.
        fastrand::shuffle(&mut indices);

        let mut all_closed = true;
        for &idx in &indices {
            match sources[idx].try_claim() {
                SourceState::Ready(value) => {
                    return Ok(Selected::Event { source: idx, value });
                }
                SourceState::Pending => {
                    all_closed = false;
                }
                SourceState::Closed => {}
            }
        }

        if all_closed {
            return Ok(Selected::Exhausted);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::deadline_exceeded(timeout));
        }

        // Back off before the next round, never sleeping past the deadline.
        thread::sleep(backoff.min(deadline - now));
        backoff = (backoff * 2).min(max_backoff);
    }
}

/// Adapts a polling closure into an [`EventSource`].
///
/// This is the glue for selecting over heterogeneous sources: wrap each
/// one in a closure that maps its readiness into a caller-defined event
/// type, then select over the wrappers.
pub struct FnSource<F> {
    poll: F,
}

/// Creates an [`EventSource`] from a polling closure.
pub fn from_fn<V, F>(poll: F) -> FnSource<F>
where
    F: Fn() -> SourceState<V>,
{
    FnSource { poll }
}

impl<V, F> EventSource<V> for FnSource<F>
where
    F: Fn() -> SourceState<V>,
{
    fn try_claim(&self) -> SourceState<V> {
        (self.poll)()
    }
}

/// A task queue is a source of its own items: claiming pops the head.
impl<T> EventSource<T> for TaskQueue<T> {
    fn try_claim(&self) -> SourceState<T> {
        match self.try_next() {
            Ok(item) => SourceState::Ready(item),
            Err(TryNextError::Empty) => SourceState::Pending,
            Err(TryNextError::Closed) => SourceState::Closed,
        }
    }
}

/// A cancellation token is a source of unit events: pending until
/// cancelled, ready on every claim thereafter. It never closes.
impl EventSource<()> for CancelToken {
    fn try_claim(&self) -> SourceState<()> {
        if self.is_cancelled() {
            SourceState::Ready(())
        } else {
            SourceState::Pending
        }
    }
}
