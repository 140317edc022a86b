//! SPSC run: one producer pushes `0..items`, the consumer checks each value.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use relay_active::affinity;
use relay_queue::{BoundedQueue, Consumer, Producer, WaitStrategy};

use crate::{ops_per_ms, wait_strategy, QueueOpts};

/// Consumer side of a round: returns the first `(expected, got)` mismatch.
type Check = fn(&mut Consumer<u64>, u64) -> Option<(u64, u64)>;

fn pin(role: &str, core: Option<usize>) {
    if let Some(core) = core {
        if let Err(err) = affinity::pin_current(&[core]) {
            warn!("{role}: cannot pin to core {core}: {err}");
        }
    }
}

fn check_sequence(consumer: &mut Consumer<u64>, items: u64) -> Option<(u64, u64)> {
    for expected in 0..items {
        let value = consumer.wait_and_pop();
        if value != expected {
            return Some((expected, value));
        }
    }
    None
}

/// Pushes `0..items`, stopping early if the consumer has gone away.
fn produce(producer: &Producer<u64>, items: u64) {
    for value in 0..items {
        let mut pending = value;
        while let Err(rejected) = producer.try_push(pending) {
            if producer.is_disconnected() {
                return;
            }
            pending = rejected;
            thread::yield_now();
        }
    }
}

fn round(opts: &QueueOpts, strategy: WaitStrategy, round: u32, check: Check) -> Result<Duration> {
    let (producer, mut consumer) = BoundedQueue::with_wait_strategy(opts.capacity, strategy)
        .context("cannot build queue")?
        .split();
    let items = opts.items;
    let consumer_core = opts.consumer_core;

    let reader = thread::Builder::new()
        .name("consumer".into())
        .spawn(move || {
            pin("consumer", consumer_core);
            check(&mut consumer, items)
        })
        .context("cannot spawn consumer")?;

    pin("producer", opts.producer_core);
    let start = Instant::now();
    produce(&producer, items);
    let mismatch = match reader.join() {
        Ok(mismatch) => mismatch,
        Err(_) => bail!("round {round}: consumer thread panicked"),
    };
    let elapsed = start.elapsed();

    if let Some((expected, got)) = mismatch {
        bail!("round {round}: data corruption, expected {expected}, got {got}");
    }
    Ok(elapsed)
}

pub fn run(opts: &QueueOpts) -> Result<()> {
    let strategy = wait_strategy(opts.park);
    println!(
        "relay queue (capacity={}, items={}, wait={strategy}):",
        opts.capacity, opts.items
    );

    for round_no in 1..=opts.rounds {
        let elapsed = round(opts, strategy, round_no, check_sequence)?;
        info!("round {round_no} finished in {elapsed:?}");
        println!(
            "  round {round_no}: {} ops/ms",
            ops_per_ms(u128::from(opts.items), elapsed)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_opts() -> QueueOpts {
        QueueOpts {
            items: 1_000,
            capacity: 4,
            park: false,
            rounds: 1,
            producer_core: None,
            consumer_core: None,
        }
    }

    #[test]
    fn ordered_round_succeeds() {
        let opts = small_opts();
        assert!(round(&opts, WaitStrategy::Spin, 1, check_sequence).is_ok());
        assert!(round(&opts, WaitStrategy::Park, 1, check_sequence).is_ok());
    }

    #[test]
    fn mismatch_fails_the_round() {
        fn stop_at_first(consumer: &mut Consumer<u64>, _items: u64) -> Option<(u64, u64)> {
            let value = consumer.wait_and_pop();
            Some((value + 1, value))
        }

        let err = round(&small_opts(), WaitStrategy::Spin, 3, stop_at_first).unwrap_err();
        assert_eq!(
            err.to_string(),
            "round 3: data corruption, expected 1, got 0"
        );
    }

    #[test]
    fn consumer_panic_fails_the_round() {
        fn explode(_consumer: &mut Consumer<u64>, _items: u64) -> Option<(u64, u64)> {
            panic!("consumer failure");
        }

        let err = round(&small_opts(), WaitStrategy::Park, 2, explode).unwrap_err();
        assert_eq!(err.to_string(), "round 2: consumer thread panicked");
    }
}
