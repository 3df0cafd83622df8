//! Persistence worker: the single consumer of the hand-off queue.

use std::sync::atomic::Ordering;

use tracing::{debug, error};

use crate::adapters::tracer::TracerShared;
use crate::adapters::writer::TraceWriter;
use crate::domain::EventBatch;
use crate::infrastructure::sink::TraceSink;

/// Drain the queue until shutdown, batching events and flushing full
/// batches through `writer`.
///
/// The loop never parks: an empty queue is retried per the shared
/// [`RetryPolicy`](crate::RetryPolicy). On the stop signal it drains the
/// queue to empty, waits out producers that were admitted before the signal
/// (via the recorded/flushed accounting) and flushes the partial batch. On
/// any write failure it flips the shared disabled flag and exits; tracing
/// degrades to "no further events recorded" without touching the
/// instrumented program.
pub(crate) fn run_drain_loop<S: TraceSink>(shared: &TracerShared, mut writer: TraceWriter<S>) {
    let mut batch = EventBatch::with_capacity(shared.batch_capacity);
    let mut attempt: u32 = 0;

    loop {
        match shared.queue.try_dequeue() {
            Some(event) => {
                attempt = 0;
                if batch.push(event) && !flush(shared, &mut writer, &mut batch) {
                    return;
                }
            }
            None => {
                if shared.stop.load(Ordering::Acquire) {
                    break;
                }
                shared.retry.backoff(attempt);
                attempt = attempt.saturating_add(1);
            }
        }
    }

    // Shutdown path. Producers admitted before the stop signal may still be
    // retrying against a full queue; keep draining until everything they
    // recorded has been dequeued.
    attempt = 0;
    loop {
        while let Some(event) = shared.queue.try_dequeue() {
            if batch.push(event) && !flush(shared, &mut writer, &mut batch) {
                return;
            }
        }
        let recorded = shared.stats.events_recorded.load(Ordering::Acquire);
        let flushed = shared.stats.events_flushed.load(Ordering::Acquire);
        if flushed + batch.len() as u64 >= recorded {
            break;
        }
        shared.retry.backoff(attempt);
        attempt = attempt.saturating_add(1);
    }

    if !batch.is_empty() && !flush(shared, &mut writer, &mut batch) {
        return;
    }
    if let Err(e) = writer.flush() {
        error!(error = %e, "final flush of trace log failed");
        shared.stats.write_errors.fetch_add(1, Ordering::Relaxed);
        shared.disabled.store(true, Ordering::Release);
        return;
    }
    debug!("persistence worker drained and stopped");
}

/// Flush the batch. Returns `false` when the trace stream is dead and the
/// worker must exit.
fn flush<S: TraceSink>(
    shared: &TracerShared,
    writer: &mut TraceWriter<S>,
    batch: &mut EventBatch,
) -> bool {
    match writer.write_batch(batch.events()) {
        Ok(()) => {
            shared
                .stats
                .events_flushed
                .fetch_add(batch.len() as u64, Ordering::Release);
            shared.stats.batches_flushed.fetch_add(1, Ordering::Relaxed);
            batch.clear();
            true
        }
        Err(e) => {
            error!(error = %e, "batch flush failed, disabling tracer");
            shared.stats.write_errors.fetch_add(1, Ordering::Relaxed);
            shared.disabled.store(true, Ordering::Release);
            false
        }
    }
}
