//! Best-effort CPU pinning.
//!
//! Pinning failures never stop a worker: callers log the error and keep the
//! thread running wherever the scheduler puts it.

use core::fmt;
use std::io;
use std::thread::JoinHandle;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AffinityError {
    #[error("no cores given")]
    Empty,
    #[error("core {core} is outside the supported range 0..{max}")]
    CoreOutOfRange { core: usize, max: usize },
    #[error("setting cpu affinity failed: {0}")]
    Os(#[from] io::Error),
    #[error("cpu affinity is not supported on this platform")]
    Unsupported,
}

/// Outcome of the pinning request made at creation time.
#[derive(Debug)]
pub enum Affinity {
    /// No cores were requested.
    Unpinned,
    /// The worker is restricted to these cores.
    Pinned(Vec<usize>),
    /// Pinning was requested but failed; the worker runs unpinned.
    Failed(AffinityError),
}

impl Affinity {
    pub fn is_pinned(&self) -> bool {
        matches!(self, Affinity::Pinned(_))
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affinity::Unpinned => write!(f, "unpinned"),
            Affinity::Pinned(cores) => write!(f, "pinned to {cores:?}"),
            Affinity::Failed(err) => write!(f, "unpinned ({err})"),
        }
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use std::io;
    use std::mem;
    use std::os::unix::thread::JoinHandleExt;
    use std::thread::JoinHandle;

    use super::AffinityError;

    fn cpu_set(cores: &[usize]) -> Result<libc::cpu_set_t, AffinityError> {
        if cores.is_empty() {
            return Err(AffinityError::Empty);
        }
        let max = libc::CPU_SETSIZE as usize;
        // SAFETY: cpu_set_t is a plain bit array; all zeroes is the empty set.
        let mut set: libc::cpu_set_t = unsafe { mem::zeroed() };
        for &core in cores {
            if core >= max {
                return Err(AffinityError::CoreOutOfRange { core, max });
            }
            // SAFETY: `core` is below CPU_SETSIZE, so the bit lies inside `set`.
            unsafe { libc::CPU_SET(core, &mut set) };
        }
        Ok(set)
    }

    pub(super) fn pin_thread<T>(
        handle: &JoinHandle<T>,
        cores: &[usize],
    ) -> Result<(), AffinityError> {
        let set = cpu_set(cores)?;
        // SAFETY: the handle has not been joined, so its pthread_t is live.
        let rc = unsafe {
            libc::pthread_setaffinity_np(
                handle.as_pthread_t(),
                mem::size_of::<libc::cpu_set_t>(),
                &set,
            )
        };
        if rc != 0 {
            return Err(AffinityError::Os(io::Error::from_raw_os_error(rc)));
        }
        Ok(())
    }

    pub(super) fn pin_current(cores: &[usize]) -> Result<(), AffinityError> {
        let set = cpu_set(cores)?;
        // SAFETY: pid 0 addresses the calling thread; `set` outlives the call.
        let rc = unsafe { libc::sched_setaffinity(0, mem::size_of::<libc::cpu_set_t>(), &set) };
        if rc != 0 {
            return Err(AffinityError::Os(io::Error::last_os_error()));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::thread::JoinHandle;

    use super::AffinityError;

    pub(super) fn pin_thread<T>(
        _handle: &JoinHandle<T>,
        cores: &[usize],
    ) -> Result<(), AffinityError> {
        if cores.is_empty() {
            return Err(AffinityError::Empty);
        }
        Err(AffinityError::Unsupported)
    }

    pub(super) fn pin_current(cores: &[usize]) -> Result<(), AffinityError> {
        if cores.is_empty() {
            return Err(AffinityError::Empty);
        }
        Err(AffinityError::Unsupported)
    }
}

/// Restricts a spawned, not yet joined thread to `cores`.
pub fn pin_thread<T>(handle: &JoinHandle<T>, cores: &[usize]) -> Result<(), AffinityError> {
    imp::pin_thread(handle, cores)
}

/// Restricts the calling thread to `cores`.
pub fn pin_current(cores: &[usize]) -> Result<(), AffinityError> {
    imp::pin_current(cores)
}
