//! Active object: one work queue and the one thread that drains it.
//!
//! The worker pops messages in FIFO order. `Run` carries a user
//! callback; `Stop` is queued by teardown behind everything sent before it,
//! which is what makes dropping an active object a full drain.

use core::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};

use crossbeam_utils::Backoff;
use log::{debug, error, warn};
use relay_queue::{BoundedQueue, Consumer, Producer};

use crate::affinity::{self, Affinity};
use crate::config::ActiveConfig;
use crate::error::{ActiveError, SendError};
use crate::lifecycle::{ActiveState, Lifecycle};

/// A unit of work executed on the worker thread.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Callback),
    Stop,
}

/// Runs callbacks sent from any thread, one at a time, on a dedicated
/// worker thread.
///
/// Only the factory functions create one, so the worker never observes a
/// half-built object. Dropping it queues a stop message, waits until every
/// earlier callback has run, and joins the worker.
///
/// A panicking callback takes the worker down for good; later callbacks are
/// discarded. Catch failures inside the callback if that matters.
pub struct ActiveObject {
    name: String,
    producer: Producer<Message>,
    lifecycle: Arc<Lifecycle>,
    worker: Option<JoinHandle<()>>,
    affinity: Affinity,
}

impl ActiveObject {
    /// Creates an unpinned active object with the default configuration.
    pub fn create() -> Result<Self, ActiveError> {
        Self::with_config(ActiveConfig::default())
    }

    /// Creates an active object whose worker is restricted to `cores`.
    ///
    /// An empty slice means no pinning. A failed pinning request is logged
    /// and the worker runs unpinned.
    pub fn create_with_cores(cores: &[usize]) -> Result<Self, ActiveError> {
        Self::with_config(ActiveConfig::builder().cores(cores.iter().copied()).build())
    }

    /// Creates an active object from a full configuration.
    pub fn with_config(config: ActiveConfig) -> Result<Self, ActiveError> {
        let ActiveConfig {
            name,
            cores,
            queue_capacity,
            wait_strategy,
        } = config;

        let (producer, consumer) =
            BoundedQueue::with_wait_strategy(queue_capacity, wait_strategy)?.split();
        let lifecycle = Arc::new(Lifecycle::new());

        let worker = {
            let lifecycle = Arc::clone(&lifecycle);
            let starter = thread::current();
            let worker_name = name.clone();
            thread::Builder::new()
                .name(name.clone())
                .spawn(move || run(consumer, lifecycle, starter, worker_name))
                .map_err(ActiveError::Spawn)?
        };

        let affinity = if cores.is_empty() {
            Affinity::Unpinned
        } else {
            match affinity::pin_thread(&worker, &cores) {
                Ok(()) => {
                    debug!("active object '{name}' pinned to cores {cores:?}");
                    Affinity::Pinned(cores)
                }
                Err(err) => {
                    warn!("active object '{name}': {err}; worker continues unpinned");
                    Affinity::Failed(err)
                }
            }
        };

        while lifecycle.get() == ActiveState::Created {
            thread::park();
        }
        debug!(
            "active object '{name}' running (capacity {queue_capacity}, {wait_strategy} wait)"
        );

        Ok(Self {
            name,
            producer,
            lifecycle,
            worker: Some(worker),
            affinity,
        })
    }

    /// Queues `callback` for execution on the worker thread and returns.
    ///
    /// Blocks only while the queue is full. Callbacks sent one after another
    /// from the same thread run in that order. If the worker has already
    /// died from a panicking callback, `callback` is dropped unrun.
    pub fn send<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.deliver(Message::Run(Box::new(callback))).is_err() {
            warn!(
                "active object '{}': worker has stopped, callback discarded",
                self.name
            );
        }
    }

    /// Queues `callback` unless the queue is full or the worker has stopped.
    pub fn try_send<F>(&self, callback: F) -> Result<(), SendError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.lifecycle.get() == ActiveState::Faulted {
            return Err(SendError::Stopped);
        }
        self.producer
            .try_push(Message::Run(Box::new(callback)))
            .map_err(|_| SendError::Full)
    }

    /// Drains the queue, stops the worker and joins it.
    ///
    /// Unlike dropping, this reports a worker that died from a panicking
    /// callback.
    pub fn shutdown(mut self) -> Result<(), ActiveError> {
        self.stop_and_join()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ActiveState {
        self.lifecycle.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ActiveState::Running
    }

    /// Snapshot of how many callbacks are waiting to run.
    pub fn pending(&self) -> usize {
        self.producer.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.producer.capacity()
    }

    /// Outcome of the pinning request made at creation.
    pub fn affinity(&self) -> &Affinity {
        &self.affinity
    }

    /// Pushes `message`, giving up only if the worker is gone.
    fn deliver(&self, mut message: Message) -> Result<(), SendError> {
        let backoff = Backoff::new();
        loop {
            if self.lifecycle.get() == ActiveState::Faulted {
                return Err(SendError::Stopped);
            }
            match self.producer.try_push(message) {
                Ok(()) => return Ok(()),
                Err(rejected) => message = rejected,
            }
            backoff.snooze();
        }
    }

    fn stop_and_join(&mut self) -> Result<(), ActiveError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        // Dropped from inside one of its own callbacks: nobody else pops, so
        // neither waiting for queue space nor joining can finish.
        let on_worker = worker.thread().id() == thread::current().id();

        if self
            .lifecycle
            .advance(ActiveState::Running, ActiveState::StopRequested)
        {
            debug!("active object '{}' stop requested", self.name);
            if on_worker {
                if self.producer.try_push(Message::Stop).is_err() {
                    warn!(
                        "active object '{}': queue full, worker drains and exits detached",
                        self.name
                    );
                }
            } else if self.deliver(Message::Stop).is_err() {
                debug!(
                    "active object '{}' faulted before stop was queued",
                    self.name
                );
            }
        }

        if on_worker {
            debug!("active object '{}' detached from its own worker", self.name);
            return Ok(());
        }

        match worker.join() {
            Ok(()) => {
                self.lifecycle.set(ActiveState::Joined);
                debug!("active object '{}' joined", self.name);
                Ok(())
            }
            Err(_) => Err(ActiveError::WorkerPanicked {
                name: self.name.clone(),
            }),
        }
    }
}

impl Drop for ActiveObject {
    fn drop(&mut self) {
        if let Err(err) = self.stop_and_join() {
            error!("{err}");
        }
    }
}

impl fmt::Debug for ActiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveObject")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .field("affinity", &self.affinity)
            .finish()
    }
}

/// Worker loop.
fn run(
    mut consumer: Consumer<Message>,
    lifecycle: Arc<Lifecycle>,
    starter: Thread,
    name: String,
) {
    let _fault = FaultGuard {
        lifecycle: &lifecycle,
        name: &name,
    };
    lifecycle.set(ActiveState::Running);
    starter.unpark();

    loop {
        let message = match consumer.try_pop() {
            Some(message) => message,
            // The owner went away without queueing `Stop`, which only happens
            // when it is dropped from a callback while the queue is full.
            None if consumer.is_disconnected() => {
                debug!("active object '{name}' orphaned, worker exits");
                break;
            }
            None => consumer.wait_and_pop(),
        };
        match message {
            Message::Run(callback) => callback(),
            Message::Stop => break,
        }
    }
    debug!("active object '{name}' worker loop finished");
}

/// Marks the lifecycle `Faulted` when a callback unwinds the worker.
struct FaultGuard<'a> {
    lifecycle: &'a Lifecycle,
    name: &'a str,
}

impl Drop for FaultGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.lifecycle.set(ActiveState::Faulted);
            error!(
                "active object '{}': callback panicked, worker thread stopped",
                self.name
            );
        }
    }
}
