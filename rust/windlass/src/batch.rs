//! One-call batch execution: payloads in, results out.
//!
//! [`run_batch`] wires a [`TaskQueue`], a [`WorkerPool`] and a collecting
//! sink together for the common case of running one job over a finite set
//! of payloads and waiting for all the outcomes. Callers that need
//! streaming submission, early shutdown or a custom sink should assemble
//! those pieces themselves.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use windlass_common::{Result, error::Error, verify_arg};

use crate::queue::TaskQueue;
use crate::sink::CollectSink;
use crate::task::{Task, TaskResult};
use crate::worker_pool::{PoolOptions, WorkerPool, panic_message};

/// Configuration of a [`run_batch`] call.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    workers: usize,
    queue_capacity: usize,
}

impl BatchOptions {
    /// One worker per logical CPU and a queue twice that deep.
    pub fn new() -> BatchOptions {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        BatchOptions {
            workers,
            queue_capacity: workers * 2,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> BatchOptions {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> BatchOptions {
        self.queue_capacity = capacity;
        self
    }

    fn validate(&self) -> Result<()> {
        verify_arg!(workers, self.workers >= 1);
        verify_arg!(queue_capacity, self.queue_capacity >= 1);
        Ok(())
    }
}

impl Default for BatchOptions {
    fn default() -> BatchOptions {
        BatchOptions::new()
    }
}

/// Runs `job` over every payload and returns one result per payload,
/// ordered to match `payloads` (task ids are the payload indices).
///
/// Individual failures and panics surface as failed [`TaskResult`]s, never
/// as an error from this call; an `Err` here means the batch could not be
/// set up at all (unusable options). Batches with at most one payload, or
/// options with a single worker, run on the calling thread.
pub fn run_batch<T, R, J>(
    options: BatchOptions,
    payloads: Vec<T>,
    job: J,
) -> Result<Vec<TaskResult<R>>>
where
    T: Send + 'static,
    R: Send + 'static,
    J: Fn(Task<T>) -> Result<R> + Send + Sync + 'static,
{
    options.validate()?;

    if payloads.is_empty() {
        return Ok(Vec::new());
    }
    if payloads.len() == 1 || options.workers == 1 {
        return Ok(run_sequential(payloads, &job));
    }

    log::debug!(
        "running batch of {} payloads on {} workers",
        payloads.len(),
        options.workers
    );

    let queue = TaskQueue::new(options.queue_capacity);
    let sink = Arc::new(CollectSink::new());
    let pool = WorkerPool::start(
        PoolOptions::new(options.workers),
        queue.clone(),
        sink.clone(),
        job,
    )?;

    for (index, payload) in payloads.into_iter().enumerate() {
        queue.submit(Task::new(index as u64, payload))?;
    }
    queue.close();
    pool.join();

    let mut results = sink.take();
    results.sort_by_key(|result| result.task_id);
    Ok(results)
}

/// In-thread fallback with the same failure containment as the pool.
fn run_sequential<T, R, J>(payloads: Vec<T>, job: &J) -> Vec<TaskResult<R>>
where
    J: Fn(Task<T>) -> Result<R>,
{
    payloads
        .into_iter()
        .enumerate()
        .map(|(index, payload)| {
            let task = Task::new(index as u64, payload);
            let task_id = task.id;
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| job(task))) {
                Ok(outcome) => outcome,
                Err(cause) => Err(Error::task_panicked(panic_message(cause.as_ref()))),
            };
            TaskResult::new(task_id, outcome)
        })
        .collect()
}
