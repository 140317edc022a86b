//! Throughput and ordering checks for the relay primitives.
//!
//! Usage:
//!     cargo run --release -p relay-bench -- queue --items 1000000
//!     cargo run --release -p relay-bench -- active --senders 4 --cores 0,1

mod active;
mod logging;
mod queue;

use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use relay_queue::{WaitStrategy, DEFAULT_CAPACITY};

#[derive(Parser, Debug)]
#[command(author, version, about = "Exercise the relay queue and active object")]
struct Opts {
    /// Log specification, e.g. `info` or `relay_active=debug`.
    #[arg(long = "log-level", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One producer thread, one consumer thread, strict ordering check.
    Queue(QueueOpts),
    /// Several sender threads feeding one active object.
    Active(ActiveOpts),
}

#[derive(Args, Debug)]
pub struct QueueOpts {
    /// Number of values pushed through the queue.
    #[arg(long, default_value_t = 1_000_000)]
    pub items: u64,

    /// Slot count, including the reserved sentinel slot.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Sleep on a condition variable instead of spinning while blocked.
    #[arg(long)]
    pub park: bool,

    /// Repeat the run this many times.
    #[arg(long, default_value_t = 1)]
    pub rounds: u32,

    #[arg(long, value_name = "CPU")]
    pub producer_core: Option<usize>,

    #[arg(long, value_name = "CPU")]
    pub consumer_core: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ActiveOpts {
    /// Number of threads calling `send` concurrently.
    #[arg(long, default_value_t = 4)]
    pub senders: usize,

    /// Callbacks sent by each sender.
    #[arg(long, default_value_t = 250_000)]
    pub items: usize,

    /// Slot count of the active object's queue.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Cores the worker may run on, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "CPU,...")]
    pub cores: Vec<usize>,

    #[arg(long)]
    pub park: bool,
}

pub(crate) fn wait_strategy(park: bool) -> WaitStrategy {
    if park {
        WaitStrategy::Park
    } else {
        WaitStrategy::Spin
    }
}

pub(crate) fn ops_per_ms(ops: u128, elapsed: Duration) -> u128 {
    ops * 1_000_000 / elapsed.as_nanos().max(1)
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let _logger = logging::init(&opts.log_level)?;

    match opts.command {
        Command::Queue(queue_opts) => queue::run(&queue_opts),
        Command::Active(active_opts) => active::run(&active_opts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_active_core_list() {
        let opts = Opts::try_parse_from(["relay-bench", "active", "--cores", "0,2", "--park"])
            .unwrap();
        match opts.command {
            Command::Active(active) => {
                assert_eq!(active.cores, vec![0, 2]);
                assert!(active.park);
                assert_eq!(active.senders, 4);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(opts.log_level, "info");
    }

    #[test]
    fn queue_defaults() {
        let opts = Opts::try_parse_from(["relay-bench", "queue"]).unwrap();
        match opts.command {
            Command::Queue(queue) => {
                assert_eq!(queue.items, 1_000_000);
                assert_eq!(queue.capacity, DEFAULT_CAPACITY);
                assert_eq!(queue.producer_core, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn throughput_guards_zero_duration() {
        assert_eq!(ops_per_ms(10, Duration::ZERO), 10_000_000);
        assert_eq!(ops_per_ms(1_000, Duration::from_millis(1)), 1_000);
    }
}
