//! A fixed-size pool of worker threads draining a shared task queue.
//!
//! The pool spawns exactly the requested number of OS threads at start and
//! never resizes. Each worker repeats one cycle: claim a task from the
//! queue, run the job on it, hand the outcome to the result sink. Workers
//! leave the cycle for exactly two reasons: the queue reports
//! closed-and-drained (graceful completion), or the pool's cancellation
//! token fires (early stop; tasks still buffered in the queue stay there).
//!
//! ## Failure containment
//!
//! A task that fails — by returning an error or by panicking — produces a
//! failed [`TaskResult`] and nothing else. The worker that ran it moves on
//! to the next task; one bad task never takes down the pool. Panics are
//! caught per task and reported as [`TaskPanicked`] outcomes.
//!
//! ## Cancellation
//!
//! Cancellation is cooperative. Workers check the token between tasks, so
//! an in-flight task always runs to completion; there is no preemption.
//! While the queue is empty, an idle worker wakes every few milliseconds
//! to re-check the token rather than blocking indefinitely.
//!
//! [`TaskPanicked`]: windlass_common::error::ErrorKind::TaskPanicked

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use windlass_common::{Result, error::Error, verify_arg};

use crate::cancel::CancelToken;
use crate::completion::CompletionTracker;
use crate::queue::{NextTimeoutError, TaskQueue};
use crate::sink::ResultSink;
use crate::task::{Task, TaskResult};

/// How often an idle worker re-checks its cancellation token while the
/// queue stays empty.
const CLAIM_TICK: Duration = Duration::from_millis(10);

/// Construction-time configuration of a [`WorkerPool`].
///
/// The worker count is fixed for the lifetime of the pool; there is no
/// dynamic resizing.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    workers: usize,
    thread_name_prefix: String,
}

impl PoolOptions {
    /// Options for a pool of `workers` threads, named
    /// `windlass-worker-<index>` unless overridden.
    pub fn new(workers: usize) -> PoolOptions {
        PoolOptions {
            workers,
            thread_name_prefix: "windlass-worker".to_string(),
        }
    }

    /// Overrides the worker thread name prefix. An empty prefix leaves the
    /// threads unnamed.
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> PoolOptions {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn validate(&self) -> Result<()> {
        verify_arg!(workers, self.workers >= 1);
        Ok(())
    }
}

impl Default for PoolOptions {
    /// One worker per logical CPU, falling back to 8 when the parallelism
    /// cannot be determined.
    fn default() -> PoolOptions {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        PoolOptions::new(workers)
    }
}

/// Counters reported by [`WorkerPool::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks claimed and run, successes and failures alike.
    pub tasks_executed: u64,
    /// The subset of executed tasks whose outcome was an error (including
    /// captured panics).
    pub tasks_failed: u64,
}

/// A running pool of worker threads.
///
/// The pool is constructed over an existing [`TaskQueue`]; the caller keeps
/// its own handle to that queue for submitting work and for closing it. The
/// usual lifecycle is:
///
/// 1. [`start`](Self::start) the pool over a queue, a sink and a job,
/// 2. submit tasks through the queue (from any number of threads),
/// 3. close the queue once everything is submitted,
/// 4. [`join`](Self::join) to wait for the drain and collect the stats.
///
/// For an early stop, [`shutdown`](Self::shutdown) instead of closing:
/// workers finish their in-flight tasks and exit, leaving unclaimed tasks
/// in the queue.
///
/// Dropping the pool without joining detaches the workers; they keep
/// draining until the queue closes or the token (if the caller kept one)
/// fires.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<thread::JoinHandle<()>>,
    cancel: CancelToken,
    tracker: CompletionTracker,
    executed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Launches `options.workers()` threads over `queue`, running `job`
    /// on every claimed task and handing each outcome to `sink`.
    ///
    /// Fails with [`InvalidArgument`] when the options are unusable (zero
    /// workers).
    ///
    /// [`InvalidArgument`]: windlass_common::error::ErrorKind::InvalidArgument
    pub fn start<T, R, J>(
        options: PoolOptions,
        queue: TaskQueue<Task<T>>,
        sink: Arc<dyn ResultSink<R>>,
        job: J,
    ) -> Result<WorkerPool>
    where
        T: Send + 'static,
        R: Send + 'static,
        J: Fn(Task<T>) -> Result<R> + Send + Sync + 'static,
    {
        options.validate()?;

        let job: Arc<dyn Fn(Task<T>) -> Result<R> + Send + Sync> = Arc::new(job);
        let cancel = CancelToken::new();
        let tracker = CompletionTracker::new();
        let executed = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        log::debug!("starting worker pool with {} workers", options.workers);

        let mut workers = Vec::with_capacity(options.workers);
        for i in 0..options.workers {
            let ctx = WorkerContext {
                queue: queue.clone(),
                sink: sink.clone(),
                job: job.clone(),
                cancel: cancel.clone(),
                tracker: tracker.clone(),
                executed: executed.clone(),
                failed: failed.clone(),
            };
            let mut builder = thread::Builder::new();
            if !options.thread_name_prefix.is_empty() {
                builder = builder.name(format!("{}-{}", options.thread_name_prefix, i));
            }
            workers.push(builder.spawn(move || worker_loop(ctx)).expect("spawn thread"));
        }

        Ok(WorkerPool {
            workers,
            cancel,
            tracker,
            executed,
            failed,
        })
    }

    /// Returns a handle onto the pool's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Asks every worker to stop claiming new tasks.
    ///
    /// In-flight tasks run to completion; tasks still buffered in the
    /// queue stay there for the caller to inspect or re-dispatch. Call
    /// [`join`](Self::join) afterwards to wait for the workers to exit.
    pub fn shutdown(&self) {
        log::debug!("worker pool shutdown requested");
        self.cancel.cancel();
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks currently claimed but not yet finished (stale the
    /// moment it is read; diagnostic only).
    pub fn in_flight(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Blocks until every worker thread has exited and reports what the
    /// pool did.
    ///
    /// Workers exit once the queue is closed and drained, or once the
    /// cancellation token has fired and their in-flight task finished.
    /// Joining without either closing the queue or shutting down blocks
    /// until someone does.
    ///
    /// # Panics
    ///
    /// Panics if a worker thread itself died. Job panics are caught and
    /// reported per task, so this indicates a panicking [`ResultSink`].
    pub fn join(self) -> PoolStats {
        for handle in self.workers {
            handle.join().expect("worker thread panicked");
        }
        let stats = PoolStats {
            tasks_executed: self.executed.load(Ordering::Relaxed),
            tasks_failed: self.failed.load(Ordering::Relaxed),
        };
        log::debug!(
            "worker pool joined: {} executed, {} failed",
            stats.tasks_executed,
            stats.tasks_failed
        );
        stats
    }
}

/// Everything one worker thread needs, cloned per worker at start.
struct WorkerContext<T, R> {
    queue: TaskQueue<Task<T>>,
    sink: Arc<dyn ResultSink<R>>,
    job: Arc<dyn Fn(Task<T>) -> Result<R> + Send + Sync>,
    cancel: CancelToken,
    tracker: CompletionTracker,
    executed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

fn worker_loop<T, R>(ctx: WorkerContext<T, R>) {
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let task = match ctx.queue.next_timeout(CLAIM_TICK) {
            Ok(task) => task,
            Err(NextTimeoutError::TimedOut) => continue,
            Err(NextTimeoutError::Closed) => break,
        };

        // Accounted from claim to sink hand-off, surviving job panics.
        let _completion = ctx.tracker.guard();

        let task_id = task.id;
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (ctx.job)(task))) {
            Ok(outcome) => outcome,
            Err(payload) => Err(Error::task_panicked(panic_message(payload.as_ref()))),
        };

        ctx.executed.fetch_add(1, Ordering::Relaxed);
        if outcome.is_err() {
            ctx.failed.fetch_add(1, Ordering::Relaxed);
        }

        ctx.sink.accept(TaskResult::new(task_id, outcome));
    }
    log::debug!("worker exiting");
}

/// Renders a panic payload into the message carried by a
/// [`TaskPanicked`](windlass_common::error::ErrorKind::TaskPanicked)
/// outcome.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
