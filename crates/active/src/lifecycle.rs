//! Worker lifecycle tracking.
//!
//! ```text
//! Created ──▶ Running ──▶ StopRequested ──▶ Joined
//!                │
//!                └──▶ Faulted   (a callback panicked)
//! ```
//!
//! There is no way back: an active object is single-use.

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Observable state of an active object's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActiveState {
    /// Worker thread spawned, loop not entered yet.
    Created = 0,
    /// Worker is popping and running callbacks.
    Running = 1,
    /// The stop message has been queued behind all earlier callbacks.
    StopRequested = 2,
    /// The worker ran the stop message and has been joined.
    Joined = 3,
    /// A callback panicked and the worker thread is gone.
    Faulted = 4,
}

impl ActiveState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ActiveState::Created,
            1 => ActiveState::Running,
            2 => ActiveState::StopRequested,
            3 => ActiveState::Joined,
            _ => ActiveState::Faulted,
        }
    }

    /// True for the states in which the worker no longer runs callbacks.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActiveState::Joined | ActiveState::Faulted)
    }
}

impl fmt::Display for ActiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveState::Created => write!(f, "Created"),
            ActiveState::Running => write!(f, "Running"),
            ActiveState::StopRequested => write!(f, "StopRequested"),
            ActiveState::Joined => write!(f, "Joined"),
            ActiveState::Faulted => write!(f, "Faulted"),
        }
    }
}

/// State word shared between the handle and its worker thread.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ActiveState::Created as u8),
        }
    }

    pub(crate) fn get(&self) -> ActiveState {
        ActiveState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ActiveState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves `from → to` only if the current state is `from`.
    pub(crate) fn advance(&self, from: ActiveState, to: ActiveState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
