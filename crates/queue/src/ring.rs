//! Shared ring buffer and its push/pop algorithm.
//!
//! # Layout
//!
//! `head` (next position to pop) and `tail` (next position to push) are
//! monotonically increasing positions, each on its own cache line. A
//! position maps to slot `position % capacity`. Occupancy is
//! `tail - head`, which never exceeds `capacity - 1`: one slot is always
//! left free so that `head == tail` means empty and nothing else.
//!
//! # Producers
//!
//! A producer acquire-loads `head` to check for space, reserves its position
//! by compare-and-swap on `tail`, writes the item, then release-stores the
//! slot's `ready` flag. Any number of producers may push concurrently.
//!
//! # Consumer
//!
//! Exactly one consumer pops. It relaxed-loads its own `head`, acquire-loads
//! `tail` to detect emptiness and the slot's `ready` flag to see the
//! finished write, moves the item out, then release-stores the advanced
//! `head`. The single-consumer rule is enforced by [`Consumer`] being the
//! only way to pop from a shared queue.
//!
//! [`Consumer`]: crate::Consumer

use core::fmt;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::{Backoff, CachePadded};

use crate::error::{QueueError, QueueResult};
use crate::handle::{Consumer, Producer};
use crate::wait::{Notifier, WaitStrategy};
use crate::{DEFAULT_CAPACITY, MIN_CAPACITY};

struct Slot<T> {
    /// Set once the item is fully written, cleared once it has been read.
    ready: AtomicBool,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn vacant() -> Self {
        Self {
            ready: AtomicBool::new(false),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Fixed-capacity lock-free FIFO queue.
///
/// Producers share the queue through `&self`; popping requires either the
/// unique [`Consumer`] handle from [`split`](Self::split) or exclusive access
/// (`&mut self`).
pub struct BoundedQueue<T> {
    tail: CachePadded<AtomicUsize>,
    head: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
    strategy: WaitStrategy,
    not_empty: Notifier,
    not_full: Notifier,
    consumer_gone: AtomicBool,
}

// SAFETY: a slot's value is written by exactly one producer (the one whose
// CAS on `tail` reserved it) and read by the single consumer only after the
// Release store / Acquire load of its `ready` flag. Producers never touch a
// slot until the consumer's Release store of `head` has moved past it.
unsafe impl<T: Send> Send for BoundedQueue<T> {}
unsafe impl<T: Send> Sync for BoundedQueue<T> {}

impl<T> BoundedQueue<T> {
    /// Creates a queue with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::build(DEFAULT_CAPACITY, WaitStrategy::default())
    }

    /// Creates a queue with `capacity` slots, of which `capacity - 1` are
    /// usable.
    pub fn with_capacity(capacity: usize) -> QueueResult<Self> {
        Self::with_wait_strategy(capacity, WaitStrategy::default())
    }

    /// Creates a queue with `capacity` slots whose blocking operations wait
    /// according to `strategy`.
    pub fn with_wait_strategy(capacity: usize, strategy: WaitStrategy) -> QueueResult<Self> {
        if capacity < MIN_CAPACITY {
            return Err(QueueError::CapacityTooSmall {
                requested: capacity,
            });
        }
        Ok(Self::build(capacity, strategy))
    }

    fn build(capacity: usize, strategy: WaitStrategy) -> Self {
        let slots = (0..capacity).map(|_| Slot::vacant()).collect();
        Self {
            tail: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(AtomicUsize::new(0)),
            slots,
            strategy,
            not_empty: Notifier::new(),
            not_full: Notifier::new(),
            consumer_gone: AtomicBool::new(false),
        }
    }

    /// Splits the queue into its producer and consumer endpoints.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let shared = Arc::new(self);
        (Producer::new(Arc::clone(&shared)), Consumer::new(shared))
    }

    /// Total slot count, including the reserved sentinel slot.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of items the queue holds at once.
    pub fn usable_capacity(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn wait_strategy(&self) -> WaitStrategy {
        self.strategy
    }

    pub(crate) fn mark_consumer_gone(&self) {
        self.consumer_gone.store(true, Ordering::Release);
    }

    pub(crate) fn is_consumer_gone(&self) -> bool {
        self.consumer_gone.load(Ordering::Acquire)
    }

    /// Snapshot of the number of queued items.
    ///
    /// The cursors are read one after the other, so the value may already be
    /// stale when it is returned.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head).min(self.usable_capacity())
    }

    /// Snapshot of whether the queue is empty. A hint, not a synchronization
    /// signal.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Snapshot of whether every usable slot is taken.
    pub fn is_full(&self) -> bool {
        self.len() >= self.usable_capacity()
    }

    /// Enqueues `item`, waiting for a free slot if the queue is full.
    pub fn push(&self, item: T) {
        let backoff = Backoff::new();
        let mut item = item;
        loop {
            match self.try_push(item) {
                Ok(()) => return,
                Err(rejected) => item = rejected,
            }
            self.strategy
                .pause(&backoff, &self.not_full, || !self.is_full());
        }
    }

    /// Enqueues `item` if a slot is free, otherwise hands it back.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let capacity = self.slots.len();
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let head = self.head.load(Ordering::Acquire);
            if tail.wrapping_sub(head) >= capacity - 1 {
                // Either truly full or our view of `tail` lags behind `head`.
                let current = self.tail.load(Ordering::Relaxed);
                if current == tail {
                    return Err(item);
                }
                tail = current;
                continue;
            }
            match self.tail.compare_exchange_weak(
                tail,
                tail.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => tail = current,
            }
        }

        let slot = &self.slots[tail % capacity];
        // SAFETY: the CAS above reserved `tail` for this thread alone, and the
        // Acquire load of `head` shows the consumer is done with this slot.
        unsafe { (*slot.value.get()).write(item) };
        slot.ready.store(true, Ordering::Release);

        if self.strategy == WaitStrategy::Park {
            self.not_empty.notify();
        }
        Ok(())
    }

    /// Pops the oldest item with exclusive access to the queue.
    pub fn try_pop(&mut self) -> Option<T> {
        // SAFETY: `&mut self` rules out any other consumer.
        unsafe { self.pop_unsynchronized() }
    }

    /// Removes the oldest published item.
    ///
    /// # Safety
    ///
    /// At most one thread may be inside this function at any time.
    pub(crate) unsafe fn pop_unsynchronized(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }

        let slot = &self.slots[head % self.slots.len()];
        if !slot.ready.load(Ordering::Acquire) {
            // Reserved by a producer that has not finished writing yet.
            return None;
        }
        let item = (*slot.value.get()).assume_init_read();
        slot.ready.store(false, Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);

        if self.strategy == WaitStrategy::Park {
            self.not_full.notify();
        }
        Some(item)
    }

    /// Blocks until an item is published, then removes it.
    ///
    /// # Safety
    ///
    /// Same contract as [`pop_unsynchronized`](Self::pop_unsynchronized).
    pub(crate) unsafe fn wait_and_pop_unsynchronized(&self) -> T {
        let backoff = Backoff::new();
        loop {
            if let Some(item) = self.pop_unsynchronized() {
                return item;
            }
            self.strategy
                .pause(&backoff, &self.not_empty, || self.has_published_front());
        }
    }

    fn has_published_front(&self) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        head != self.tail.load(Ordering::Acquire)
            && self.slots[head % self.slots.len()]
                .ready
                .load(Ordering::Acquire)
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for BoundedQueue<T> {
    fn drop(&mut self) {
        let capacity = self.slots.len();
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let mut position = head;
        while position != tail {
            let slot = &mut self.slots[position % capacity];
            if *slot.ready.get_mut() {
                // SAFETY: `ready` marks an initialized value nobody has read.
                unsafe { slot.value.get_mut().assume_init_drop() };
            }
            position = position.wrapping_add(1);
        }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("strategy", &self.strategy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_capacity_without_room_for_sentinel() {
        assert_eq!(
            BoundedQueue::<u8>::with_capacity(1).unwrap_err(),
            QueueError::CapacityTooSmall { requested: 1 }
        );
        assert!(BoundedQueue::<u8>::with_capacity(0).is_err());
        assert!(BoundedQueue::<u8>::with_capacity(2).is_ok());
    }

    #[test]
    fn full_at_capacity_minus_one() {
        let mut queue = BoundedQueue::with_capacity(4).unwrap();
        assert_eq!(queue.usable_capacity(), 3);

        assert!(queue.try_push(1).is_ok());
        assert!(queue.try_push(2).is_ok());
        assert!(queue.try_push(3).is_ok());
        assert!(queue.is_full());
        assert_eq!(queue.try_push(4), Err(4));
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.try_pop(), Some(1));
        assert!(queue.try_push(4).is_ok());
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), Some(4));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn wraps_around_many_laps() {
        let mut queue = BoundedQueue::with_capacity(3).unwrap();
        for lap in 0..100u32 {
            queue.try_push(lap * 2).unwrap();
            queue.try_push(lap * 2 + 1).unwrap();
            assert_eq!(queue.try_pop(), Some(lap * 2));
            assert_eq!(queue.try_pop(), Some(lap * 2 + 1));
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn unpublished_slot_reads_as_no_item() {
        let mut queue = BoundedQueue::<u32>::with_capacity(4).unwrap();
        // Simulate a producer that reserved a position but has not written.
        queue.tail.store(1, Ordering::Relaxed);
        assert!(!queue.is_empty());
        assert_eq!(queue.try_pop(), None);
        queue.tail.store(0, Ordering::Relaxed);
    }
}
