//! Task identity and per-task outcome types.

use serde::{Deserialize, Serialize};

/// Identifier correlating a submitted task with its eventual result.
///
/// Identifiers are assigned by the submitter; the engine treats them as
/// opaque and never derives meaning from their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(id: u64) -> TaskId {
        TaskId(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> TaskId {
        TaskId(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of work: an identifier plus an arbitrary payload.
///
/// A task is owned by the queue it was submitted to until a worker claims
/// it; ownership then moves into that worker for the duration of execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task<T> {
    pub id: TaskId,
    pub payload: T,
}

impl<T> Task<T> {
    pub fn new(id: impl Into<TaskId>, payload: T) -> Task<T> {
        Task {
            id: id.into(),
            payload,
        }
    }

    /// Maps the payload, keeping the identifier.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Task<U> {
        Task {
            id: self.id,
            payload: f(self.payload),
        }
    }
}

/// The outcome of one executed task.
///
/// Results may arrive in any order relative to submission: workers run
/// concurrently and finish when they finish. The `task_id` is the only
/// correlation between a result and the task that produced it.
#[derive(Debug)]
pub struct TaskResult<R> {
    pub task_id: TaskId,
    pub outcome: windlass_common::Result<R>,
}

impl<R> TaskResult<R> {
    pub fn new(task_id: TaskId, outcome: windlass_common::Result<R>) -> TaskResult<R> {
        TaskResult { task_id, outcome }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display_and_order() {
        let a = TaskId::new(3);
        let b = TaskId::from(17);
        assert!(a < b);
        assert_eq!(a.to_string(), "3");
        assert_eq!(b.as_u64(), 17);
    }

    #[test]
    fn test_task_map_keeps_id() {
        let task = Task::new(9u64, "abc");
        let mapped = task.map(|s| s.len());
        assert_eq!(mapped.id, TaskId::new(9));
        assert_eq!(mapped.payload, 3);
    }

    #[test]
    fn test_task_json_round_trip() {
        let task = Task::new(42u64, vec![1u32, 2, 3]);
        let text = serde_json::to_string(&task).unwrap();
        let back: Task<Vec<u32>> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, task);
    }
}
