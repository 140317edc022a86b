//! Cross-thread stress tests for the ring buffer.

use std::thread;

use relay_queue::{BoundedQueue, WaitStrategy};

const ITEMS: u64 = 1_000_000;

fn spsc_round(capacity: usize, strategy: WaitStrategy) {
    let (producer, mut consumer) = BoundedQueue::with_wait_strategy(capacity, strategy)
        .expect("valid capacity")
        .split();

    let writer = thread::spawn(move || {
        for value in 0..ITEMS {
            producer.push(value);
        }
    });

    for expected in 0..ITEMS {
        assert_eq!(consumer.wait_and_pop(), expected);
    }
    writer.join().expect("producer thread");
    assert!(consumer.is_empty());
    assert!(consumer.is_disconnected());
}

#[test]
fn spsc_sees_every_value_in_order() {
    for _ in 0..3 {
        spsc_round(1024 + 1, WaitStrategy::Spin);
    }
}

#[test]
fn spsc_tiny_ring_forces_wraparound() {
    spsc_round(2, WaitStrategy::Spin);
}

#[test]
fn spsc_park_strategy() {
    spsc_round(64 + 1, WaitStrategy::Park);
}

#[test]
fn mpsc_keeps_per_producer_order() {
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 100_000;

    for strategy in [WaitStrategy::Spin, WaitStrategy::Park] {
        let (producer, mut consumer) = BoundedQueue::with_wait_strategy(256 + 1, strategy)
            .expect("valid capacity")
            .split();

        let writers: Vec<_> = (0..PRODUCERS)
            .map(|id| {
                let producer = producer.clone();
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        producer.push((id, seq));
                    }
                })
            })
            .collect();
        drop(producer);

        let mut next = vec![0u64; PRODUCERS as usize];
        for _ in 0..PRODUCERS * PER_PRODUCER {
            let (id, seq) = consumer.wait_and_pop();
            assert_eq!(seq, next[id as usize], "producer {id} out of order");
            next[id as usize] += 1;
        }

        for writer in writers {
            writer.join().expect("producer thread");
        }
        assert!(next.iter().all(|&count| count == PER_PRODUCER));
        assert_eq!(consumer.try_pop(), None);
    }
}

#[test]
fn default_queue_holds_a_million_items() {
    let (producer, mut consumer) = BoundedQueue::<u32>::new().split();
    assert_eq!(producer.capacity(), relay_queue::DEFAULT_CAPACITY);

    for value in 0..(1u32 << 20) {
        assert!(producer.try_push(value).is_ok());
    }
    assert_eq!(producer.try_push(u32::MAX), Err(u32::MAX));
    assert_eq!(consumer.try_pop(), Some(0));
}
