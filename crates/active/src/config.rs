//! Creation options for an [`ActiveObject`](crate::ActiveObject).

use relay_queue::{WaitStrategy, DEFAULT_CAPACITY};

/// Configuration for an active object.
///
/// An empty `cores` list leaves the worker unpinned. A non-empty list
/// restricts it to those CPU cores on a best-effort basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConfig {
    /// Worker thread name, also used in log records.
    pub name: String,
    /// Cores the worker may run on; empty means unpinned.
    pub cores: Vec<usize>,
    /// Slot count of the work queue, one of which stays reserved.
    pub queue_capacity: usize,
    /// How the idle worker waits for work.
    pub wait_strategy: WaitStrategy,
}

impl Default for ActiveConfig {
    fn default() -> Self {
        Self {
            name: String::from("active"),
            cores: Vec::new(),
            queue_capacity: DEFAULT_CAPACITY,
            wait_strategy: WaitStrategy::Spin,
        }
    }
}

impl ActiveConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ActiveConfigBuilder {
        ActiveConfigBuilder::default()
    }
}

/// Builder for ergonomic active object configuration.
#[derive(Debug, Clone, Default)]
pub struct ActiveConfigBuilder {
    config: ActiveConfig,
}

impl ActiveConfigBuilder {
    /// Sets the worker thread name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Replaces the set of cores the worker may run on.
    pub fn cores(mut self, cores: impl IntoIterator<Item = usize>) -> Self {
        self.config.cores = cores.into_iter().collect();
        self
    }

    /// Adds one core to the allowed set.
    pub fn core(mut self, core: usize) -> Self {
        self.config.cores.push(core);
        self
    }

    /// Sets the queue slot count, including the reserved sentinel slot.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn wait_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.config.wait_strategy = strategy;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ActiveConfig {
        self.config
    }
}
