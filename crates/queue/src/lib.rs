//! # relay-queue
//!
//! A fixed-capacity, lock-free ring buffer for handing values from one or
//! more producer threads to a single consumer thread.
//!
//! ## Module Overview
//! - [`ring`]   – The shared [`BoundedQueue`] and its push/pop algorithm.
//! - [`handle`] – [`Producer`] and [`Consumer`] endpoints returned by
//!   [`BoundedQueue::split`].
//! - [`wait`]   – How blocking operations wait ([`WaitStrategy`]).
//! - [`error`]  – Construction errors.
//!
//! The queue never grows. One slot is always kept free so that equal cursors
//! mean "empty" and never "full"; a queue built with capacity `C` holds at
//! most `C - 1` items.
//!
//! ```
//! use relay_queue::BoundedQueue;
//!
//! let (producer, mut consumer) = BoundedQueue::with_capacity(4).unwrap().split();
//! producer.push('a');
//! producer.push('b');
//! assert_eq!(consumer.wait_and_pop(), 'a');
//! assert_eq!(consumer.try_pop(), Some('b'));
//! assert!(consumer.is_empty());
//! ```

pub mod error;
pub mod handle;
pub mod ring;
pub mod wait;

pub use error::QueueError;
pub use handle::{Consumer, Drain, Producer};
pub use ring::BoundedQueue;
pub use wait::WaitStrategy;

/// Default number of slots: `2^20` usable items plus the reserved sentinel.
pub const DEFAULT_CAPACITY: usize = (1 << 20) + 1;

/// Smallest capacity that can hold one item next to the sentinel slot.
pub const MIN_CAPACITY: usize = 2;
