//! # relay-active
//!
//! An active object owns one [`BoundedQueue`](relay_queue::BoundedQueue) and
//! one worker thread. Any thread may [`send`](ActiveObject::send) a closure;
//! the worker runs the closures one at a time, in the order they were
//! queued. Dropping the object drains the queue and joins the worker.
//!
//! ## Module Overview
//! - [`active`]    – The [`ActiveObject`] handle and its worker loop.
//! - [`config`]    – Creation options and their builder.
//! - [`lifecycle`] – Observable [`ActiveState`] of the worker.
//! - [`affinity`]  – Best-effort CPU pinning.
//! - [`error`]     – Error types.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use relay_active::ActiveObject;
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let active = ActiveObject::create().unwrap();
//! for i in 0..3 {
//!     let log = Arc::clone(&log);
//!     active.send(move || log.lock().unwrap().push(i));
//! }
//! drop(active);
//! assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
//! ```

pub mod active;
pub mod affinity;
pub mod config;
pub mod error;
pub mod lifecycle;

pub use active::{ActiveObject, Callback};
pub use affinity::{Affinity, AffinityError};
pub use config::{ActiveConfig, ActiveConfigBuilder};
pub use error::{ActiveError, SendError};
pub use lifecycle::ActiveState;
pub use relay_queue::WaitStrategy;

#[cfg(test)]
mod tests;
