//! Producer and consumer endpoints of a split [`BoundedQueue`].
//!
//! [`Producer`] is `Clone`: hand a copy to every thread that pushes.
//! [`Consumer`] is not, and pops through `&mut self`, so exactly one thread
//! can ever pop from a queue.

use core::fmt;
use std::sync::Arc;

use crate::ring::BoundedQueue;
use crate::wait::WaitStrategy;

/// Push side of a queue.
pub struct Producer<T> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> Producer<T> {
    pub(crate) fn new(queue: Arc<BoundedQueue<T>>) -> Self {
        Self { queue }
    }

    /// Enqueues `item`, blocking while the queue is full. Never drops.
    pub fn push(&self, item: T) {
        self.queue.push(item);
    }

    /// Enqueues `item` without blocking; returns it back if the queue is
    /// full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.queue.try_push(item)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn wait_strategy(&self) -> WaitStrategy {
        self.queue.wait_strategy()
    }

    /// Returns true once the [`Consumer`] has been dropped. Nothing pushed
    /// after that point will ever be popped.
    pub fn is_disconnected(&self) -> bool {
        self.queue.is_consumer_gone()
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Producer").field(&self.queue).finish()
    }
}

/// Pop side of a queue. There is exactly one per queue.
pub struct Consumer<T> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> Consumer<T> {
    pub(crate) fn new(queue: Arc<BoundedQueue<T>>) -> Self {
        Self { queue }
    }

    /// Removes the oldest item, or returns `None` if none is available.
    pub fn try_pop(&mut self) -> Option<T> {
        // SAFETY: `Consumer` is unique per queue and `&mut self` serializes
        // calls on it.
        unsafe { self.queue.pop_unsynchronized() }
    }

    /// Blocks until an item is available, then removes it.
    pub fn wait_and_pop(&mut self) -> T {
        // SAFETY: see `try_pop`.
        unsafe { self.queue.wait_and_pop_unsynchronized() }
    }

    /// Pops every item available right now.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { consumer: self }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Returns true once every [`Producer`] has been dropped.
    ///
    /// Only this handle pops, so an empty queue that reports disconnected
    /// stays empty.
    pub fn is_disconnected(&self) -> bool {
        Arc::strong_count(&self.queue) == 1
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.queue.mark_consumer_gone();
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Consumer").field(&self.queue).finish()
    }
}

/// Iterator returned by [`Consumer::drain`]. Stops at the first empty read.
pub struct Drain<'a, T> {
    consumer: &'a mut Consumer<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.consumer.try_pop()
    }
}
