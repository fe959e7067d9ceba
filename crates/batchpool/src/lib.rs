//! # Batch Worker Pool
//!
//! Runs a fixed batch of tasks across a fixed number of concurrent workers,
//! enforcing a per-task timeout and aggregating results as they arrive.
//!
//! ## Features
//!
//! - **Bounded fan-out**: `worker_count` workers pull from one queue sized to the batch
//! - **Per-task deadline**: each execution races a timeout; late results are abandoned, never awaited
//! - **Two-phase shutdown**: the task queue closes after submission, the result sink only once every task concluded
//! - **Distinct outcomes**: completed, timed-out and failed tasks are counted separately
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  submit_all   ┌─────────────┐
//! │     Pool     │──────────────▶│  TaskQueue  │  (closed after submission)
//! │ (coordinator)│               └──────┬──────┘
//! └──────┬───────┘                      │ pull
//!        │ in-flight latch      ┌───────┴───────┐
//!        │                      ▼               ▼
//!        │                ┌──────────┐    ┌──────────┐
//!        │                │ Worker 1 │ …  │ Worker N │  execution ⟷ timeout race
//!        │                └────┬─────┘    └────┬─────┘
//!        │                     └──────┬────────┘
//!        ▼                            ▼ completed ids
//! ┌──────────────┐  close when idle ┌────────────┐
//! │   Summary    │◀─────────────────│ ResultSink │
//! └──────────────┘                  └────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use batchpool::{PoolConfig, Pool, Task, TaskError};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> Result<(), batchpool::PoolError> {
//! let config = PoolConfig::new(4, 20, Duration::from_millis(500)).with_name("docs");
//!
//! let pool = Pool::new(config, |task: Task| async move {
//!     if task.id.get() % 10 == 0 {
//!         // Never reports; the pool times it out.
//!         std::future::pending::<()>().await;
//!     }
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     Ok::<_, TaskError>(())
//! })?;
//!
//! let summary = pool.run_to_completion().await?;
//! assert_eq!(summary.completed_count, 18);
//! assert_eq!(summary.timed_out_count, 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod inflight;
pub mod pool;
mod queue;
pub mod summary;
pub mod task;
mod worker;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::PoolConfig;
    pub use crate::error::{PoolError, TaskError};
    pub use crate::pool::{new_pool, Pool, PoolStatus};
    pub use crate::summary::Summary;
    pub use crate::task::{Task, TaskExecutor, TaskId, TaskOutcome, TaskResult};
}

// Re-export key types at crate root
pub use config::PoolConfig;
pub use error::{PoolError, Result, TaskError};
pub use pool::{new_pool, Pool, PoolStatus};
pub use queue::ResultStream;
pub use summary::Summary;
pub use task::{Task, TaskExecutor, TaskId, TaskOutcome, TaskResult};
pub use worker::TaskFailure;
