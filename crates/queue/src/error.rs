//! Errors raised while building a queue.

use thiserror::Error;

use crate::MIN_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The requested slot count leaves no room next to the sentinel slot.
    #[error("queue capacity {requested} is too small, at least {MIN_CAPACITY} slots are required")]
    CapacityTooSmall { requested: usize },
}

pub type QueueResult<T> = Result<T, QueueError>;
