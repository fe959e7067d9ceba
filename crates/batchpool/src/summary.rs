//! Batch summary

use serde::{Deserialize, Serialize};

use crate::task::TaskId;
use crate::worker::TaskFailure;

/// Final accounting of a batch
///
/// Every submitted task lands in exactly one of the three counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Tasks whose execution reported success before the deadline
    pub completed_count: usize,
    /// Tasks abandoned at the deadline
    pub timed_out_count: usize,
    /// Tasks whose execution reported an error
    pub failed_count: usize,
    /// Completed ids in arrival order
    pub completed_ids: Vec<TaskId>,
    /// Failed tasks with their errors
    pub failures: Vec<TaskFailure>,
    /// Tasks concluded per worker, indexed by `worker_id - 1`
    pub per_worker: Vec<usize>,
}

impl Summary {
    /// Total number of concluded tasks
    pub fn total(&self) -> usize {
        self.completed_count + self.timed_out_count + self.failed_count
    }

    /// Whether every task completed
    pub fn all_completed(&self) -> bool {
        self.timed_out_count == 0 && self.failed_count == 0
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tasks: {} completed, {} timed out, {} failed",
            self.total(),
            self.completed_count,
            self.timed_out_count,
            self.failed_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_totals() {
        let summary = Summary {
            completed_count: 45,
            timed_out_count: 5,
            ..Default::default()
        };
        assert_eq!(summary.total(), 50);
        assert!(!summary.all_completed());
        assert_eq!(
            summary.to_string(),
            "50 tasks: 45 completed, 5 timed out, 0 failed"
        );
    }

    #[test]
    fn test_empty_summary_is_all_completed() {
        assert!(Summary::default().all_completed());
    }
}
