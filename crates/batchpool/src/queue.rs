//! Task queue and result sink
//!
//! Both conduits are bounded multi-producer/multi-consumer channels sized to
//! the batch. Only the pool coordinator closes them.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_channel::{Receiver, Sender};
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::error::{PoolError, Result};
use crate::inflight::InFlightGuard;
use crate::task::{Task, TaskId};

/// A queued task together with its in-flight slot
#[derive(Debug)]
pub(crate) struct Dispatch {
    pub task: Task,
    pub guard: InFlightGuard,
}

/// FIFO conduit of tasks from the submitter to the workers
#[derive(Debug)]
pub(crate) struct TaskQueue {
    tx: Sender<Dispatch>,
    rx: Receiver<Dispatch>,
}

impl TaskQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Enqueue a task; never waits while below capacity
    ///
    /// On failure the dispatch is dropped, which releases its in-flight slot.
    pub async fn submit(&self, dispatch: Dispatch) -> Result<()> {
        self.tx
            .send(dispatch)
            .await
            .map_err(|e| PoolError::QueueClosed(e.into_inner().task.id))
    }

    /// Signal that no more tasks will be submitted
    ///
    /// Returns `false` if the queue was already closed.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    /// Receiving handle for one worker
    pub fn consumer(&self) -> TaskConsumer {
        TaskConsumer {
            rx: self.rx.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }
}

/// Worker side of the task queue
#[derive(Debug, Clone)]
pub(crate) struct TaskConsumer {
    rx: Receiver<Dispatch>,
}

impl TaskConsumer {
    /// Next task, or `None` once the queue is closed and drained
    pub async fn next(&self) -> Option<Dispatch> {
        self.rx.recv().await.ok()
    }
}

/// FIFO conduit of completed task ids
#[derive(Debug)]
pub(crate) struct ResultSink {
    tx: Sender<TaskId>,
    rx: parking_lot::Mutex<Option<Receiver<TaskId>>>,
}

impl ResultSink {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self {
            tx,
            rx: parking_lot::Mutex::new(Some(rx)),
        }
    }

    /// Sending handle for one worker
    pub fn producer(&self) -> ResultProducer {
        ResultProducer {
            tx: self.tx.clone(),
        }
    }

    /// Close the sink; buffered ids remain readable
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Hand out the one and only result stream
    pub fn take_stream(&self) -> Result<ResultStream> {
        self.rx
            .lock()
            .take()
            .map(|rx| ResultStream { inner: rx.boxed() })
            .ok_or(PoolError::ResultsTaken)
    }
}

/// Worker side of the result sink
#[derive(Debug, Clone)]
pub(crate) struct ResultProducer {
    tx: Sender<TaskId>,
}

impl ResultProducer {
    /// Record a completed task
    ///
    /// Fails only if the sink was closed while the task was in flight, which
    /// the in-flight latch rules out.
    pub async fn record(&self, id: TaskId) -> std::result::Result<(), TaskId> {
        self.tx.send(id).await.map_err(|e| e.into_inner())
    }
}

/// Lazy, finite stream of completed task ids
///
/// Ends once the pool has closed its result sink and every buffered id has
/// been read. It cannot be restarted.
pub struct ResultStream {
    inner: BoxStream<'static, TaskId>,
}

impl Stream for ResultStream {
    type Item = TaskId;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream").finish_non_exhaustive()
    }
}
