//! Error types for the pool and for task execution

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pool::PoolStatus;
use crate::task::TaskId;

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors surfaced by the pool coordinator
///
/// Timeouts and execution failures of individual tasks are never reported
/// here; they are contained in the worker and counted in the summary.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration rejected by validation
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// Operation called out of lifecycle order
    #[error("cannot {operation} while pool is {status:?}")]
    InvalidState {
        operation: &'static str,
        status: PoolStatus,
    },

    /// Submission after the task queue was closed
    #[error("task queue is closed, cannot submit task {0}")]
    QueueClosed(TaskId),

    /// The result stream was already handed out
    #[error("results have already been taken from this pool")]
    ResultsTaken,

    /// A worker task panicked outside of task execution
    #[error("worker {worker_id} panicked: {message}")]
    WorkerPanicked { worker_id: usize, message: String },
}

/// Error returned by a task executor
///
/// A failed execution is a distinct outcome from a timeout: it skips the
/// result sink like a timeout does, but it is counted separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskError {
    /// Error message
    pub message: String,

    /// Error type/code for programmatic handling
    pub error_type: Option<String>,
}

impl TaskError {
    /// Create a new task error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
        }
    }

    /// Set the error type
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Execution ended without reporting (the executor panicked)
    pub(crate) fn abandoned() -> Self {
        Self::new("execution ended without reporting a result").with_type("ABANDONED")
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_type {
            Some(error_type) => write!(f, "{}: {}", error_type, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TaskError {}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}
