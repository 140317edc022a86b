//! Waiting policy for the blocking queue operations.
//!
//! Both strategies keep the same observable contract: a blocked `push` or
//! `wait_and_pop` returns only once space or data is available, with no
//! timeout. They differ in what the waiting thread does in the meantime.

use core::fmt;
use std::sync::atomic::{self, AtomicUsize, Ordering};

use crossbeam_utils::Backoff;
use parking_lot::{Condvar, Mutex};

/// How a blocked producer or consumer waits for the other side.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitStrategy {
    /// Spin with exponential backoff, then yield the processor between
    /// attempts. Lowest wake-up latency, burns CPU while idle.
    #[default]
    Spin,
    /// Spin briefly, then sleep on a condition variable until the other side
    /// signals progress.
    Park,
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitStrategy::Spin => write!(f, "spin"),
            WaitStrategy::Park => write!(f, "park"),
        }
    }
}

impl WaitStrategy {
    /// Runs one waiting step after a failed attempt.
    ///
    /// `ready` must re-check the condition the caller is waiting for; it is
    /// only consulted by [`WaitStrategy::Park`] before going to sleep.
    pub(crate) fn pause(
        self,
        backoff: &Backoff,
        notifier: &Notifier,
        ready: impl FnMut() -> bool,
    ) {
        match self {
            WaitStrategy::Spin => backoff.snooze(),
            WaitStrategy::Park if !backoff.is_completed() => backoff.snooze(),
            WaitStrategy::Park => {
                notifier.wait_until(ready);
                backoff.reset();
            }
        }
    }
}

/// Sleep/wake handshake for one direction of the queue.
///
/// The mutex guards nothing but the handshake itself; queue data never goes
/// through it. `sleepers` lets the waking side skip the lock entirely when
/// nobody is asleep.
pub(crate) struct Notifier {
    lock: Mutex<()>,
    cond: Condvar,
    sleepers: AtomicUsize,
}

impl Notifier {
    pub(crate) fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            cond: Condvar::new(),
            sleepers: AtomicUsize::new(0),
        }
    }

    /// Blocks until `ready` returns true.
    pub(crate) fn wait_until(&self, mut ready: impl FnMut() -> bool) {
        let mut guard = self.lock.lock();
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        // Pairs with the fence in `notify`: either the waker sees our
        // registration or we see its cursor update.
        atomic::fence(Ordering::SeqCst);
        while !ready() {
            self.cond.wait(&mut guard);
        }
        self.sleepers.fetch_sub(1, Ordering::SeqCst);
    }

    /// Wakes every sleeper, if there are any.
    pub(crate) fn notify(&self) {
        atomic::fence(Ordering::SeqCst);
        if self.sleepers.load(Ordering::SeqCst) > 0 {
            // Taking the lock orders this wake-up after the sleeper's
            // last readiness check.
            drop(self.lock.lock());
            self.cond.notify_all();
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("sleepers", &self.sleepers.load(Ordering::Relaxed))
            .finish()
    }
}
