//! In-flight task accounting
//!
//! A countdown latch: the counter goes up once per submitted task and down
//! once per concluded task. The decrement is owned by an [`InFlightGuard`]
//! that travels with the task, so it happens exactly once whichever way the
//! task concludes, including when the task is dropped unprocessed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    count: AtomicUsize,
    idle: Notify,
}

/// Shared counter of submitted but unconcluded tasks
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlightCounter {
    inner: Arc<Inner>,
}

impl InFlightCounter {
    /// Create a counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more task in flight
    ///
    /// The returned guard decrements the counter when dropped.
    #[must_use = "dropping the guard immediately concludes the task"]
    pub fn acquire(&self) -> InFlightGuard {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Count a whole batch in flight at once
    ///
    /// The counter reaches `count` before any guard is handed out, so it
    /// cannot touch zero while the batch is still being submitted.
    pub fn acquire_many(&self, count: usize) -> Vec<InFlightGuard> {
        (0..count).map(|_| self.acquire()).collect()
    }

    /// Current number of tasks in flight
    pub fn current(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Wait until no task is in flight
    pub async fn wait_idle(&self) {
        loop {
            // Register before checking so a concurrent release cannot slip by.
            let notified = self.inner.idle.notified();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Ownership of one in-flight slot
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let previous = self.inner.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "in-flight counter underflow");
        if previous == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_guard_decrements_once() {
        let counter = InFlightCounter::new();
        let first = counter.acquire();
        let second = counter.acquire();
        assert_eq!(counter.current(), 2);

        drop(first);
        assert_eq!(counter.current(), 1);
        drop(second);
        assert_eq!(counter.current(), 0);
    }

    #[tokio::test]
    async fn test_acquire_many_counts_batch_up_front() {
        let counter = InFlightCounter::new();
        let mut guards = counter.acquire_many(4);
        assert_eq!(counter.current(), 4);

        // Releasing all but one never reaches idle.
        for _ in 0..3 {
            drop(guards.pop());
            assert!(counter.current() > 0);
            let idle = tokio::time::timeout(Duration::from_millis(10), counter.wait_idle()).await;
            assert!(idle.is_err());
        }

        drop(guards);
        assert_eq!(counter.current(), 0);
        counter.wait_idle().await;
    }

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_at_zero() {
        let counter = InFlightCounter::new();
        tokio::time::timeout(Duration::from_millis(100), counter.wait_idle())
            .await
            .expect("idle counter should not block");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_blocks_until_last_release() {
        let counter = InFlightCounter::new();
        let guards: Vec<_> = (0..3).map(|_| counter.acquire()).collect();

        let releaser = tokio::spawn(async move {
            for guard in guards {
                tokio::time::sleep(Duration::from_millis(10)).await;
                drop(guard);
            }
        });

        counter.wait_idle().await;
        assert_eq!(counter.current(), 0);
        releaser.await.unwrap();
    }

    #[tokio::test]
    async fn test_guards_released_across_tasks() {
        let counter = InFlightCounter::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let guard = counter.acquire();
            handles.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                drop(guard);
            }));
        }

        counter.wait_idle().await;
        assert_eq!(counter.current(), 0);
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
