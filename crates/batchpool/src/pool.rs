//! Pool coordinator
//!
//! Owns the task queue, the result sink and the in-flight latch, and drives
//! the batch through start → submit → wait → close → summarize.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::inflight::InFlightCounter;
use crate::queue::{Dispatch, ResultSink, ResultStream, TaskQueue};
use crate::summary::Summary;
use crate::task::{Task, TaskExecutor};
use crate::worker::{OutcomeTally, Worker};

/// Pool lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    /// Constructed, no workers yet
    Created,
    /// Workers are running, waiting for tasks
    Running,
    /// Tasks are being enqueued
    Submitting,
    /// Task queue closed, workers draining the remaining tasks
    Draining,
    /// Every task concluded and the result sink is closed
    Closed,
}

/// Build a pool from plain parameters
///
/// # Example
///
/// ```
/// use batchpool::{new_pool, Task, TaskResult};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), batchpool::PoolError> {
/// let pool = new_pool(2, 10, Duration::from_secs(1), |_task: Task| async {
///     TaskResult::Ok(())
/// })?;
///
/// let summary = pool.run_to_completion().await?;
/// assert_eq!(summary.completed_count, 10);
/// # Ok(())
/// # }
/// ```
pub fn new_pool<E: TaskExecutor>(
    worker_count: usize,
    task_count: usize,
    task_timeout: Duration,
    executor: E,
) -> Result<Pool> {
    Pool::new(
        PoolConfig::new(worker_count, task_count, task_timeout),
        executor,
    )
}

/// Bounded batch worker pool
///
/// The step-by-step API mirrors the batch lifecycle. Waiting and draining
/// must overlap: [`Pool::summarize`] only finishes once
/// [`Pool::await_completion_and_close`] has closed the result sink.
///
/// ```ignore
/// pool.start()?;
/// pool.submit_all().await?;
/// let (closed, summary) = tokio::join!(pool.await_completion_and_close(), pool.summarize());
/// closed?;
/// let summary = summary?;
/// ```
pub struct Pool {
    config: PoolConfig,
    executor: Arc<dyn TaskExecutor>,
    queue: TaskQueue,
    sink: ResultSink,
    in_flight: InFlightCounter,
    tally: Arc<OutcomeTally>,
    status: RwLock<PoolStatus>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    /// Create a pool; both conduits are sized to the batch
    pub fn new<E: TaskExecutor>(config: PoolConfig, executor: E) -> Result<Self> {
        Self::with_executor(config, Arc::new(executor))
    }

    /// Create a pool from a shared executor
    pub fn with_executor(config: PoolConfig, executor: Arc<dyn TaskExecutor>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            queue: TaskQueue::with_capacity(config.task_count),
            sink: ResultSink::with_capacity(config.task_count),
            in_flight: InFlightCounter::new(),
            tally: Arc::new(OutcomeTally::new(config.worker_count)),
            status: RwLock::new(PoolStatus::Created),
            workers: Mutex::new(Vec::with_capacity(config.worker_count)),
            executor,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get current status
    pub fn status(&self) -> PoolStatus {
        *self.status.read()
    }

    /// Tasks submitted but not yet concluded
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    /// Spawn the workers
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self), fields(pool = %self.config.name))]
    pub fn start(&self) -> Result<()> {
        self.transition("start", PoolStatus::Created, PoolStatus::Running)?;

        info!(
            worker_count = self.config.worker_count,
            task_count = self.config.task_count,
            task_timeout_ms = self.config.task_timeout.as_millis() as u64,
            "Starting worker pool"
        );

        let mut workers = self.workers.lock();
        for id in 1..=self.config.worker_count {
            let worker = Worker {
                id,
                pool: self.config.name.clone(),
                timeout: self.config.task_timeout,
                tasks: self.queue.consumer(),
                results: self.sink.producer(),
                executor: Arc::clone(&self.executor),
                tally: Arc::clone(&self.tally),
            };
            workers.push(tokio::spawn(worker.run()));
        }

        Ok(())
    }

    /// Enqueue tasks `1..=task_count` in order, then close the task queue
    ///
    /// Returns the number of tasks submitted.
    #[instrument(skip(self), fields(pool = %self.config.name))]
    pub async fn submit_all(&self) -> Result<usize> {
        self.transition("submit tasks", PoolStatus::Running, PoolStatus::Submitting)?;

        // The whole batch is counted before any task is visible to a worker.
        let guards = self.in_flight.acquire_many(self.config.task_count);

        let mut submitted = 0;
        for (task, guard) in Task::batch(self.config.task_count).zip(guards) {
            if let Err(e) = self.queue.submit(Dispatch { task, guard }).await {
                self.queue.close();
                *self.status.write() = PoolStatus::Draining;
                return Err(e);
            }
            submitted += 1;
        }

        debug!(queued = self.queue.len(), "All tasks enqueued");
        self.queue.close();
        *self.status.write() = PoolStatus::Draining;

        info!(submitted, "Task queue closed");
        Ok(submitted)
    }

    /// Wait for every submitted task to conclude, then close the result sink
    ///
    /// Run this concurrently with [`Pool::summarize`] or [`Pool::results`].
    #[instrument(skip(self), fields(pool = %self.config.name))]
    pub async fn await_completion_and_close(&self) -> Result<()> {
        self.check("await completion", PoolStatus::Draining)?;

        self.in_flight.wait_idle().await;
        // Only one caller gets to close the sink.
        self.transition("close results", PoolStatus::Draining, PoolStatus::Closed)?;
        self.sink.close();
        debug_assert!(self.sink.is_closed());
        info!("All tasks concluded, result sink closed");

        self.join_workers().await
    }

    /// Take the stream of completed task ids
    ///
    /// The stream is handed out once and ends after the result sink closes.
    pub fn results(&self) -> Result<ResultStream> {
        self.sink.take_stream()
    }

    /// Drain the result sink and build the summary
    #[instrument(skip(self), fields(pool = %self.config.name))]
    pub async fn summarize(&self) -> Result<Summary> {
        let completed_ids: Vec<_> = self.results()?.collect().await;

        // The sink closes only after every task concluded, so the tally is final.
        let failures = self.tally.failures();
        let summary = Summary {
            completed_count: completed_ids.len(),
            timed_out_count: self.tally.timed_out(),
            failed_count: failures.len(),
            completed_ids,
            failures,
            per_worker: self.tally.per_worker(),
        };

        if summary.total() != self.config.task_count {
            warn!(
                concluded = summary.total(),
                expected = self.config.task_count,
                "Batch summary does not cover every task"
            );
        }

        info!(
            completed = summary.completed_count,
            timed_out = summary.timed_out_count,
            failed = summary.failed_count,
            "Batch summarized"
        );
        Ok(summary)
    }

    /// Run the whole batch: start, submit, then wait and drain concurrently
    pub async fn run_to_completion(self) -> Result<Summary> {
        self.start()?;
        self.submit_all().await?;

        let (closed, summary) =
            tokio::join!(self.await_completion_and_close(), self.summarize());
        closed?;
        summary
    }

    async fn join_workers(&self) -> Result<()> {
        let handles = std::mem::take(&mut *self.workers.lock());

        let mut panicked = None;
        for (index, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                let worker_id = index + 1;
                error!(worker_id, "Worker task failed: {}", e);
                if panicked.is_none() && e.is_panic() {
                    panicked = Some(PoolError::WorkerPanicked {
                        worker_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!("Workers joined");
        panicked.map_or(Ok(()), Err)
    }

    fn check(&self, operation: &'static str, expected: PoolStatus) -> Result<()> {
        let status = self.status();
        if status != expected {
            return Err(PoolError::InvalidState { operation, status });
        }
        Ok(())
    }

    fn transition(
        &self,
        operation: &'static str,
        from: PoolStatus,
        to: PoolStatus,
    ) -> Result<()> {
        let mut status = self.status.write();
        if *status != from {
            return Err(PoolError::InvalidState {
                operation,
                status: *status,
            });
        }
        *status = to;
        Ok(())
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("status", &self.status())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}
