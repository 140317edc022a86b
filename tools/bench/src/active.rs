//! Fan-in run: several threads send numbered callbacks to one active object.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::info;
use relay_active::{ActiveConfig, ActiveObject};

use crate::{ops_per_ms, wait_strategy, ActiveOpts};

/// Per-sender next expected sequence number, owned by the worker.
struct Tally {
    next: Vec<usize>,
    out_of_order: usize,
}

pub fn run(opts: &ActiveOpts) -> Result<()> {
    let config = ActiveConfig::builder()
        .name("bench-worker")
        .cores(opts.cores.iter().copied())
        .queue_capacity(opts.capacity)
        .wait_strategy(wait_strategy(opts.park))
        .build();
    let active = ActiveObject::with_config(config).context("cannot create active object")?;
    let active = Arc::new(active);
    println!(
        "relay active (senders={}, items={}, {}):",
        opts.senders,
        opts.items,
        active.affinity()
    );

    let tally = Arc::new(Mutex::new(Tally {
        next: vec![0; opts.senders],
        out_of_order: 0,
    }));

    let start = Instant::now();
    let senders = (0..opts.senders)
        .map(|sender| {
            let active = Arc::clone(&active);
            let tally = Arc::clone(&tally);
            let items = opts.items;
            thread::Builder::new()
                .name(format!("sender-{sender}"))
                .spawn(move || {
                    for seq in 0..items {
                        let tally = Arc::clone(&tally);
                        active.send(move || {
                            let mut tally = tally.lock().unwrap_or_else(|e| e.into_inner());
                            if tally.next[sender] != seq {
                                tally.out_of_order += 1;
                            }
                            tally.next[sender] = seq + 1;
                        });
                    }
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .context("cannot spawn sender")?;

    for sender in senders {
        if sender.join().is_err() {
            bail!("sender thread panicked");
        }
    }
    let active = match Arc::try_unwrap(active) {
        Ok(active) => active,
        Err(_) => bail!("active object still shared after senders finished"),
    };
    active.shutdown()?;
    let elapsed = start.elapsed();

    let tally = tally.lock().unwrap_or_else(|e| e.into_inner());
    if tally.out_of_order > 0 {
        bail!("{} callbacks ran out of per-sender order", tally.out_of_order);
    }
    if let Some((sender, &count)) = tally
        .next
        .iter()
        .enumerate()
        .find(|(_, count)| **count != opts.items)
    {
        bail!("sender {sender}: {count} of {} callbacks ran", opts.items);
    }

    let total = (opts.senders * opts.items) as u128;
    info!("{total} callbacks drained in {elapsed:?}");
    println!("  {} ops/ms", ops_per_ms(total, elapsed));
    Ok(())
}
