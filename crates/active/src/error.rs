//! Error types for active objects.

use std::io;

use relay_queue::QueueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActiveError {
    /// The OS refused to start the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// A callback panicked and took the worker thread down.
    #[error("worker thread of active object '{name}' panicked")]
    WorkerPanicked { name: String },
}

/// Why [`ActiveObject::try_send`](crate::ActiveObject::try_send) refused a
/// callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("active object queue is full")]
    Full,
    #[error("active object worker has stopped")]
    Stopped,
}
