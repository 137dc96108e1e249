//! The seam through which task results leave the engine.
//!
//! Workers never decide where results go; they hand each [`TaskResult`] to
//! a [`ResultSink`] chosen by whoever assembled the pipeline. The crate
//! ships three: [`CollectSink`] gathers results into memory,
//! a [`TaskQueue`] of results forwards them onward (turning results into a
//! selectable event source for a downstream consumer), and [`DiscardSink`]
//! drops them for fire-and-forget workloads.

use std::sync::Mutex;

use crate::queue::TaskQueue;
use crate::task::TaskResult;

/// Accepts results produced by worker threads.
///
/// Implementations are shared across workers, so `accept` takes `&self`
/// and must tolerate concurrent calls. Accepting must not fail outward:
/// a sink that cannot take a result records the fact (and may drop the
/// result) rather than unwinding into the worker.
pub trait ResultSink<R>: Send + Sync {
    fn accept(&self, result: TaskResult<R>);
}

/// Collects results into a mutex-guarded vector, in arrival order.
#[derive(Debug, Default)]
pub struct CollectSink<R> {
    results: Mutex<Vec<TaskResult<R>>>,
}

impl<R> CollectSink<R> {
    pub fn new() -> CollectSink<R> {
        CollectSink {
            results: Mutex::new(Vec::new()),
        }
    }

    /// Drains everything collected so far.
    pub fn take(&self) -> Vec<TaskResult<R>> {
        std::mem::take(&mut self.results.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Send> ResultSink<R> for CollectSink<R> {
    fn accept(&self, result: TaskResult<R>) {
        self.results.lock().unwrap().push(result);
    }
}

/// Forwarding into a queue of results: blocks on a full queue (the
/// downstream consumer provides the backpressure), drops the result with a
/// warning if the queue was closed underneath the workers.
impl<R: Send> ResultSink<R> for TaskQueue<TaskResult<R>> {
    fn accept(&self, result: TaskResult<R>) {
        if let Err(rejected) = self.submit(result) {
            log::warn!(
                "result queue is closed; dropping result of task {}",
                rejected.into_inner().task_id
            );
        }
    }
}

/// Swallows every result.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl<R> ResultSink<R> for DiscardSink {
    fn accept(&self, _result: TaskResult<R>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;

    #[test]
    fn test_collect_sink_gathers_in_arrival_order() {
        let sink = CollectSink::new();
        assert!(sink.is_empty());

        sink.accept(TaskResult::new(TaskId::new(1), Ok(10)));
        sink.accept(TaskResult::new(TaskId::new(2), Ok(20)));
        assert_eq!(sink.len(), 2);

        let results = sink.take();
        assert_eq!(results[0].task_id, TaskId::new(1));
        assert_eq!(results[1].task_id, TaskId::new(2));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_queue_as_sink_forwards_results() {
        let results = TaskQueue::new(4);
        let sink: &dyn ResultSink<i32> = &results;

        sink.accept(TaskResult::new(TaskId::new(7), Ok(70)));

        let forwarded = results.next().unwrap();
        assert_eq!(forwarded.task_id, TaskId::new(7));
        assert_eq!(forwarded.outcome.unwrap(), 70);
    }

    #[test]
    fn test_queue_as_sink_tolerates_closed_queue() {
        let results = TaskQueue::<TaskResult<i32>>::new(4);
        results.close();

        // Must not panic; the result is dropped with a warning.
        let sink: &dyn ResultSink<i32> = &results;
        sink.accept(TaskResult::new(TaskId::new(1), Ok(1)));
        assert!(matches!(
            results.try_next(),
            Err(crate::queue::TryNextError::Closed)
        ));
    }

    #[test]
    fn test_discard_sink_swallows() {
        let sink = DiscardSink;
        sink.accept(TaskResult::new(TaskId::new(1), Ok("gone")));
    }
}
