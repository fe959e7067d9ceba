//! Task descriptors and the executor capability

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Unique, positive task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Create a task id, `None` for zero
    pub fn new(id: u64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Raw id value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of work in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task id, unique within the batch
    pub id: TaskId,
    /// Display label derived from the id
    pub label: String,
}

impl Task {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            id,
            label: format!("Task {id}"),
        }
    }

    /// Build the batch `1..=count` in submission order
    pub(crate) fn batch(count: usize) -> impl Iterator<Item = Task> {
        (1..=count as u64).map(|id| Task::new(TaskId(id)))
    }
}

/// How a task's processing concluded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Execution reported success before the deadline
    Completed,
    /// Deadline elapsed first; any late result is discarded
    TimedOut,
    /// Execution reported an error before the deadline
    Failed { error: TaskError },
}

/// Result of a single execution
pub type TaskResult = Result<(), TaskError>;

/// Capability that executes one task
///
/// The pool imposes its timeout on every call and makes no other assumption
/// about latency. An execution that never returns is timed out and left to
/// run on its own.
///
/// Any `Fn(Task) -> impl Future<Output = TaskResult>` is an executor:
///
/// ```
/// use batchpool::{Task, TaskExecutor, TaskResult};
///
/// fn assert_executor<E: TaskExecutor>(_: &E) {}
///
/// let executor = |task: Task| async move {
///     let _ = task.id;
///     TaskResult::Ok(())
/// };
/// assert_executor(&executor);
/// ```
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    /// Execute the task
    async fn execute(&self, task: Task) -> TaskResult;
}

#[async_trait]
impl<F, Fut> TaskExecutor for F
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    async fn execute(&self, task: Task) -> TaskResult {
        (self)(task).await
    }
}
