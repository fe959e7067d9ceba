//! Worker loop and the per-task timeout race

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use crate::error::TaskError;
use crate::queue::{Dispatch, ResultProducer, TaskConsumer};
use crate::task::{Task, TaskExecutor, TaskId, TaskOutcome};

/// A failed task and the error its executor reported
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TaskFailure {
    /// Failed task
    pub task_id: TaskId,
    /// Reported error
    pub error: TaskError,
}

/// Outcome counters shared by all workers
///
/// Completions are not counted here; they are counted by draining the
/// result sink.
#[derive(Debug)]
pub(crate) struct OutcomeTally {
    timed_out: AtomicUsize,
    failures: Mutex<Vec<TaskFailure>>,
    per_worker: Vec<AtomicUsize>,
}

impl OutcomeTally {
    pub fn new(worker_count: usize) -> Self {
        Self {
            timed_out: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
            per_worker: (0..worker_count).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn timed_out(&self) -> usize {
        self.timed_out.load(Ordering::Acquire)
    }

    pub fn failures(&self) -> Vec<TaskFailure> {
        self.failures.lock().clone()
    }

    /// Tasks concluded per worker, indexed by `worker_id - 1`
    pub fn per_worker(&self) -> Vec<usize> {
        self.per_worker
            .iter()
            .map(|count| count.load(Ordering::Acquire))
            .collect()
    }

    fn record(&self, worker_id: usize, task_id: TaskId, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Completed => {}
            TaskOutcome::TimedOut => {
                self.timed_out.fetch_add(1, Ordering::AcqRel);
            }
            TaskOutcome::Failed { error } => self.failures.lock().push(TaskFailure {
                task_id,
                error: error.clone(),
            }),
        }
        if let Some(count) = worker_id
            .checked_sub(1)
            .and_then(|index| self.per_worker.get(index))
        {
            count.fetch_add(1, Ordering::AcqRel);
        }
    }
}

/// One concurrent worker
///
/// Holds no state between tasks beyond its shared handles.
pub(crate) struct Worker {
    pub id: usize,
    pub pool: String,
    pub timeout: Duration,
    pub tasks: TaskConsumer,
    pub results: ResultProducer,
    pub executor: Arc<dyn TaskExecutor>,
    pub tally: Arc<OutcomeTally>,
}

impl Worker {
    /// Process tasks until the queue is closed and drained
    #[instrument(name = "worker", skip(self), fields(pool = %self.pool, worker_id = self.id))]
    pub async fn run(self) {
        debug!("Worker started");

        let mut processed = 0usize;
        while let Some(dispatch) = self.tasks.next().await {
            self.process(dispatch).await;
            processed += 1;
        }

        debug!(processed, "Worker exited, task queue closed");
    }

    /// Race one task's execution against the deadline
    async fn process(&self, dispatch: Dispatch) {
        let Dispatch { task, guard } = dispatch;
        let task_id = task.id;
        debug!(%task_id, label = %task.label, "Task dispatched");

        let outcome = self.execute_with_timeout(task).await;
        match &outcome {
            TaskOutcome::Completed => {
                if let Err(task_id) = self.results.record(task_id).await {
                    warn!(%task_id, "Result sink closed before task concluded");
                }
                debug!(%task_id, "Task completed");
            }
            TaskOutcome::TimedOut => {
                warn!(
                    %task_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Task timed out, abandoning"
                );
            }
            TaskOutcome::Failed { error } => {
                warn!(%task_id, %error, "Task execution failed");
            }
        }

        self.tally.record(self.id, task_id, &outcome);
        // Concludes the task; must come after the outcome is recorded.
        drop(guard);
    }

    async fn execute_with_timeout(&self, task: Task) -> TaskOutcome {
        let (tx, rx) = oneshot::channel();
        let executor = Arc::clone(&self.executor);

        // Not aborted on timeout: a late result lands in the slot unread.
        tokio::spawn(async move {
            let result = executor.execute(task).await;
            let _ = tx.send(result);
        });

        // Timers tick in whole milliseconds; a zero deadline has already passed.
        if self.timeout.is_zero() {
            return TaskOutcome::TimedOut;
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(()))) => TaskOutcome::Completed,
            Ok(Ok(Err(error))) => TaskOutcome::Failed { error },
            Ok(Err(_)) => TaskOutcome::Failed {
                error: TaskError::abandoned(),
            },
            Err(_) => TaskOutcome::TimedOut,
        }
    }
}
