//! End-to-end pipeline tests: producer API through queue, worker and file,
//! read back with the offline reader.

use gctrace::{
    BaseAddress, HandoffQueue, RetryPolicy, TraceEvent, TraceEventKind, TraceReader, Tracer,
    TracerConfig, TracerHandle,
};

const BASE: BaseAddress = BaseAddress(0x1000_0000);

fn temp_log() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gc_events.bin");
    (dir, path)
}

#[test]
fn single_allocation_round_trips() {
    let (_dir, path) = temp_log();
    let tracer = Tracer::init(TracerConfig::new(&path, BASE)).unwrap();
    let handle = tracer.handle();

    handle.record_allocation(0x1000_0040, 64);
    tracer.shutdown().unwrap();

    let log = TraceReader::read_path(&path).unwrap();
    assert_eq!(log.base.absolute_address, BASE.0);
    assert_eq!(log.events.len(), 1);

    let event = &log.events[0];
    assert_eq!(event.kind, TraceEventKind::Allocate);
    assert_eq!(event.relative_address, 0x40);
    assert_eq!(event.size, 64);
    assert_eq!(log.absolute_address(event), 0x1000_0040);
}

#[test]
fn two_thousand_marks_split_into_two_batches() {
    let (_dir, path) = temp_log();
    let tracer = Tracer::init(TracerConfig::new(&path, BASE)).unwrap();
    let handle = tracer.handle();

    for i in 0..2000u64 {
        handle.record_gc_mark(BASE.0 + i);
    }
    let stats = handle.stats();
    assert_eq!(stats.events_recorded, 2000);

    tracer.shutdown().unwrap();

    let log = TraceReader::read_path(&path).unwrap();
    assert_eq!(log.events.len(), 2000);
    for (i, event) in log.events.iter().enumerate() {
        assert_eq!(event.kind, TraceEventKind::GCMark);
        assert_eq!(event.size, 0);
        assert_eq!(event.relative_address, i as u32);
    }

    // One full batch of 1024 and one shutdown-flushed batch of 976.
    let stats = handle.stats();
    assert_eq!(stats.batches_flushed, 2);
    assert_eq!(stats.events_flushed, 2000);
}

#[test]
fn order_is_preserved_for_a_single_producer() {
    let (_dir, path) = temp_log();
    let config = TracerConfig::new(&path, BASE).batch_capacity(16);
    let tracer = Tracer::init(config).unwrap();
    let handle = tracer.handle();

    for i in 0..100u64 {
        if i % 2 == 0 {
            handle.record_allocation(BASE.0 + i, 32);
        } else {
            handle.record_gc_mark(BASE.0 + i);
        }
    }
    tracer.shutdown().unwrap();

    let log = TraceReader::read_path(&path).unwrap();
    assert_eq!(log.events.len(), 100);
    for (i, event) in log.events.iter().enumerate() {
        assert_eq!(event.relative_address, i as u32);
        let expected = if i % 2 == 0 {
            TraceEventKind::Allocate
        } else {
            TraceEventKind::GCMark
        };
        assert_eq!(event.kind, expected);
    }
}

#[test]
fn no_loss_when_producer_outruns_the_worker() {
    let (_dir, path) = temp_log();
    // Tiny queue and batch so the producer keeps hitting a full queue while
    // the worker is busy with file writes.
    let config = TracerConfig::new(&path, BASE)
        .queue_capacity(4)
        .batch_capacity(8)
        .retry_policy(RetryPolicy::new(8));
    let tracer = Tracer::init(config).unwrap();
    let handle = tracer.handle();

    const EVENTS: u64 = 2000;
    let producer = {
        let handle = handle.clone();
        std::thread::spawn(move || {
            for i in 0..EVENTS {
                handle.record_allocation(BASE.0 + i, 16);
            }
        })
    };
    producer.join().unwrap();
    tracer.shutdown().unwrap();

    let stats = handle.stats();
    assert_eq!(stats.events_recorded, EVENTS);
    assert_eq!(stats.events_flushed, EVENTS);
    assert_eq!(stats.out_of_range, 0);

    let log = TraceReader::read_path(&path).unwrap();
    assert_eq!(log.events.len(), EVENTS as usize);
    for (i, event) in log.events.iter().enumerate() {
        assert_eq!(event.relative_address, i as u32);
    }
}

#[test]
fn paused_consumer_holds_producer_without_loss() {
    // Queue-contract version of the paused-consumer scenario: the producer
    // busy-retries against a full queue until the consumer resumes.
    let queue = std::sync::Arc::new(HandoffQueue::with_capacity(4));
    let retry = RetryPolicy::new(16);

    const EVENTS: u32 = 200;
    let producer = {
        let queue = std::sync::Arc::clone(&queue);
        std::thread::spawn(move || {
            for i in 0..EVENTS {
                let mut event = TraceEvent::gc_mark(BASE, BASE.0 + i as u64).unwrap();
                let mut attempt = 0;
                while let Err(full) = queue.try_enqueue(event) {
                    event = full.0;
                    retry.backoff(attempt);
                    attempt += 1;
                }
            }
        })
    };

    // Consumer pauses before draining anything.
    std::thread::sleep(std::time::Duration::from_millis(50));

    let mut drained = Vec::new();
    while drained.len() < EVENTS as usize {
        if let Some(event) = queue.try_dequeue() {
            drained.push(event);
        } else {
            std::thread::yield_now();
        }
    }
    producer.join().unwrap();

    assert_eq!(drained.len(), EVENTS as usize);
    for (i, event) in drained.iter().enumerate() {
        assert_eq!(event.relative_address, i as u32);
    }
}

#[test]
fn concurrent_producers_lose_nothing() {
    let (_dir, path) = temp_log();
    let config = TracerConfig::new(&path, BASE)
        .queue_capacity(64)
        .batch_capacity(32);
    let tracer = Tracer::init(config).unwrap();

    const PER_THREAD: u64 = 500;
    let threads: Vec<_> = (0..4u64)
        .map(|t| {
            let handle = tracer.handle();
            std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    handle.record_gc_mark(BASE.0 + t * PER_THREAD + i);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let handle = tracer.handle();
    tracer.shutdown().unwrap();

    let stats = handle.stats();
    assert_eq!(stats.events_recorded, 4 * PER_THREAD);
    assert_eq!(stats.events_flushed, 4 * PER_THREAD);

    let log = TraceReader::read_path(&path).unwrap();
    assert_eq!(log.events.len(), (4 * PER_THREAD) as usize);

    // Inter-thread order is admission order; per-thread order must hold.
    let mut last_seen = [None::<u32>; 4];
    for event in &log.events {
        let thread = (event.relative_address as u64 / PER_THREAD) as usize;
        if let Some(prev) = last_seen[thread] {
            assert!(event.relative_address > prev);
        }
        last_seen[thread] = Some(event.relative_address);
    }
}

#[test]
fn calls_after_shutdown_are_ignored() {
    let (_dir, path) = temp_log();
    let tracer = Tracer::init(TracerConfig::new(&path, BASE)).unwrap();
    let handle = tracer.handle();

    handle.record_allocation(BASE.0 + 0x10, 8);
    tracer.shutdown().unwrap();

    assert!(handle.is_disabled());
    handle.record_allocation(BASE.0 + 0x20, 8);
    handle.record_gc_mark(BASE.0 + 0x20);

    let log = TraceReader::read_path(&path).unwrap();
    assert_eq!(log.events.len(), 1);
}

#[test]
fn drop_flushes_like_shutdown() {
    let (_dir, path) = temp_log();
    let handle: TracerHandle;
    {
        let tracer = Tracer::init(TracerConfig::new(&path, BASE)).unwrap();
        handle = tracer.handle();
        handle.record_gc_mark(BASE.0 + 1);
        // Tracer dropped here without an explicit shutdown call.
    }

    assert_eq!(handle.stats().events_flushed, 1);
    let log = TraceReader::read_path(&path).unwrap();
    assert_eq!(log.events.len(), 1);
}
