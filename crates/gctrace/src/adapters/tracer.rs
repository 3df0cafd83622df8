//! Tracer composition root and producer API.
//!
//! The tracer is an explicitly constructed component: the process's
//! composition root calls [`Tracer::init`] once, keeps the [`Tracer`] for
//! teardown and threads cloned [`TracerHandle`]s to allocation and mark
//! call sites. There is no hidden global instance.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::Serialize;
use tracing::{debug, warn};

use crate::adapters::worker::run_drain_loop;
use crate::adapters::writer::TraceWriter;
use crate::domain::{BaseAddress, BaseAddressRecord, RetryPolicy, TraceEvent};
use crate::infrastructure::queue::{HandoffQueue, QueueFull};
use crate::infrastructure::sink::FileSink;

/// Worker thread name, visible in debuggers and thread listings.
const WORKER_THREAD_NAME: &str = "gctrace-flush";

/// Errors surfaced by tracer lifecycle operations.
///
/// Producer-side recording never returns these; recording degrades to a
/// no-op when the trace stream dies.
#[derive(Debug)]
pub enum TraceError {
    /// A configuration value is unusable.
    Config(&'static str),
    /// Opening the log file, the initial base-address write, or spawning
    /// the worker failed.
    Io(io::Error),
    /// The persistence worker panicked; the tail of the trace is lost.
    WorkerPanicked,
    /// A batch flush failed during the run; the log is truncated at the
    /// last successful batch.
    StreamFailed,
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(reason) => write!(f, "invalid tracer configuration: {reason}"),
            Self::Io(e) => write!(f, "trace log I/O failure: {e}"),
            Self::WorkerPanicked => f.write_str("persistence worker panicked"),
            Self::StreamFailed => f.write_str("trace stream failed; log is truncated"),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TraceError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Tracer configuration.
///
/// `log_path` and `base_address` are required; capacities and the retry
/// policy default to the reference tuning (1024-slot queue, 1024-event
/// batches).
#[derive(Debug, Clone)]
pub struct TracerConfig {
    log_path: PathBuf,
    base_address: BaseAddress,
    queue_capacity: usize,
    batch_capacity: usize,
    retry: RetryPolicy,
}

impl TracerConfig {
    /// Default capacity of the hand-off queue, in events.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

    /// Default flush threshold of the worker's batch buffer, in events.
    pub const DEFAULT_BATCH_CAPACITY: usize = 1024;

    /// Configure a tracer writing to `log_path`, relativizing against
    /// `base_address` (typically the heap arena start).
    pub fn new(log_path: impl Into<PathBuf>, base_address: BaseAddress) -> Self {
        Self {
            log_path: log_path.into(),
            base_address,
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            batch_capacity: Self::DEFAULT_BATCH_CAPACITY,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the hand-off queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the batch flush threshold.
    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    /// Set the busy-retry policy used on both sides of the queue.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn validate(&self) -> Result<(), TraceError> {
        if self.queue_capacity == 0 {
            return Err(TraceError::Config("queue capacity must be nonzero"));
        }
        if self.batch_capacity == 0 {
            return Err(TraceError::Config("batch capacity must be nonzero"));
        }
        Ok(())
    }
}

/// Internal counters shared between producers and the worker.
#[derive(Debug, Default)]
pub(crate) struct TracerStats {
    /// Events admitted by the producer API. Incremented before the enqueue
    /// so the worker's shutdown drain can wait out in-flight producers.
    pub(crate) events_recorded: AtomicU64,
    /// Enqueue attempts rejected with a full queue.
    pub(crate) enqueue_retries: AtomicU64,
    /// Events dropped because their address was outside the 32-bit window.
    pub(crate) out_of_range: AtomicU64,
    /// Events durably handed to the sink.
    pub(crate) events_flushed: AtomicU64,
    /// Batches written, including the partial batch at shutdown.
    pub(crate) batches_flushed: AtomicU64,
    /// Failed sink writes. Nonzero means the log is truncated.
    pub(crate) write_errors: AtomicU64,
}

/// Point-in-time view of the tracer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Events admitted by the producer API.
    pub events_recorded: u64,
    /// Enqueue attempts that hit a full queue and retried.
    pub enqueue_retries: u64,
    /// Events dropped for being outside the address window.
    pub out_of_range: u64,
    /// Events flushed to the sink.
    pub events_flushed: u64,
    /// Batches flushed to the sink.
    pub batches_flushed: u64,
    /// Failed sink writes.
    pub write_errors: u64,
}

impl TracerStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_recorded: self.events_recorded.load(Ordering::Acquire),
            enqueue_retries: self.enqueue_retries.load(Ordering::Relaxed),
            out_of_range: self.out_of_range.load(Ordering::Relaxed),
            events_flushed: self.events_flushed.load(Ordering::Acquire),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// State shared by every handle and the worker thread.
#[derive(Debug)]
pub(crate) struct TracerShared {
    pub(crate) queue: HandoffQueue,
    pub(crate) base: BaseAddress,
    pub(crate) retry: RetryPolicy,
    pub(crate) batch_capacity: usize,
    /// Graceful-shutdown signal: gates new producer calls and tells the
    /// worker to drain and exit.
    pub(crate) stop: AtomicBool,
    /// Dead-stream flag: set when the worker hits an unrecoverable write
    /// error (or for a no-op handle). Producers bail out immediately.
    pub(crate) disabled: AtomicBool,
    pub(crate) stats: TracerStats,
}

impl TracerShared {
    pub(crate) fn new(
        base: BaseAddress,
        queue_capacity: usize,
        batch_capacity: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            queue: HandoffQueue::with_capacity(queue_capacity),
            base,
            retry,
            batch_capacity,
            stop: AtomicBool::new(false),
            disabled: AtomicBool::new(false),
            stats: TracerStats::default(),
        }
    }
}

/// Process-lifetime owner of the trace pipeline.
///
/// Construction opens the log file in append mode, writes the base-address
/// record, creates the hand-off queue and spawns the persistence worker, in
/// that order. Dropping the tracer performs a best-effort
/// [`shutdown`](Tracer::shutdown).
#[derive(Debug)]
pub struct Tracer {
    shared: Arc<TracerShared>,
    worker: Option<JoinHandle<()>>,
}

impl Tracer {
    /// Bring up the trace pipeline.
    ///
    /// # Errors
    ///
    /// [`TraceError::Config`] for unusable capacities, [`TraceError::Io`]
    /// when the log file cannot be opened, the base-address record cannot
    /// be written, or the worker thread cannot be spawned. Callers that
    /// must keep running without tracing can fall back to
    /// [`TracerHandle::disabled`].
    pub fn init(config: TracerConfig) -> Result<Self, TraceError> {
        config.validate()?;

        let sink = FileSink::open_append(&config.log_path)?;
        let mut writer = TraceWriter::new(sink);
        writer.write_base_address(BaseAddressRecord::new(config.base_address))?;

        let shared = Arc::new(TracerShared::new(
            config.base_address,
            config.queue_capacity,
            config.batch_capacity,
            config.retry,
        ));

        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name(WORKER_THREAD_NAME.into())
                .spawn(move || run_drain_loop(&shared, writer))?
        };

        debug!(
            log_path = %config.log_path.display(),
            base = %config.base_address,
            queue = config.queue_capacity,
            batch = config.batch_capacity,
            "tracer started"
        );

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// A cheap, cloneable handle for allocation and mark call sites.
    pub fn handle(&self) -> TracerHandle {
        TracerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Stop the pipeline: gate new producer calls, let the worker drain the
    /// queue and flush the partial batch, then join it.
    ///
    /// Events recorded before this call are flushed; calls racing with the
    /// shutdown may be dropped.
    ///
    /// # Errors
    ///
    /// [`TraceError::WorkerPanicked`] if the worker thread panicked,
    /// [`TraceError::StreamFailed`] if any batch write failed during the
    /// run (the log holds everything up to the last good batch).
    pub fn shutdown(mut self) -> Result<(), TraceError> {
        self.shutdown_inner()
    }

    fn shutdown_inner(&mut self) -> Result<(), TraceError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.shared.stop.store(true, Ordering::Release);
        let joined = worker.join();
        self.shared.disabled.store(true, Ordering::Release);
        if joined.is_err() {
            return Err(TraceError::WorkerPanicked);
        }
        if self.shared.stats.write_errors.load(Ordering::Relaxed) > 0 {
            return Err(TraceError::StreamFailed);
        }
        Ok(())
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.shutdown_inner() {
                warn!(error = %e, "tracer shutdown on drop failed");
            }
        }
    }
}

/// Producer-side entry points, safe to call from any thread.
///
/// All methods are hot-path safe: no file I/O, no heap allocation, no
/// locks. Backpressure from a full queue is absorbed by busy-retrying per
/// the configured [`RetryPolicy`]; nothing is dropped while the worker is
/// alive. When the trace stream is dead every call returns immediately.
#[derive(Debug, Clone)]
pub struct TracerHandle {
    shared: Arc<TracerShared>,
}

impl TracerHandle {
    /// A handle that records nothing.
    ///
    /// The fallback for composition roots whose [`Tracer::init`] failed and
    /// that must keep the instrumented program running.
    pub fn disabled() -> Self {
        let shared = TracerShared::new(BaseAddress(0), 1, 1, RetryPolicy::default());
        shared.disabled.store(true, Ordering::Release);
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Whether the trace stream is dead or shut down.
    pub fn is_disabled(&self) -> bool {
        self.shared.disabled.load(Ordering::Acquire) || self.shared.stop.load(Ordering::Acquire)
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Record an allocation of `size` bytes at `absolute_address`.
    ///
    /// Addresses outside the 32-bit window above the configured base are
    /// dropped with a warning; see the crate docs for the range contract.
    #[inline]
    pub fn record_allocation(&self, absolute_address: u64, size: u32) {
        match TraceEvent::allocation(self.shared.base, absolute_address, size) {
            Ok(event) => self.log(event),
            Err(e) => self.reject_out_of_range(e),
        }
    }

    /// Record a mark of the object at `absolute_address`.
    #[inline]
    pub fn record_gc_mark(&self, absolute_address: u64) {
        match TraceEvent::gc_mark(self.shared.base, absolute_address) {
            Ok(event) => self.log(event),
            Err(e) => self.reject_out_of_range(e),
        }
    }

    /// Enqueue an already-built event unchanged.
    ///
    /// Escape hatch for tests and future event kinds; the relativizing
    /// constructors are the normal entry points.
    pub fn log(&self, event: TraceEvent) {
        if self.is_disabled() {
            return;
        }
        self.shared
            .stats
            .events_recorded
            .fetch_add(1, Ordering::Release);

        let mut event = event;
        let mut attempt: u32 = 0;
        loop {
            match self.shared.queue.try_enqueue(event) {
                Ok(()) => return,
                Err(QueueFull(back)) => {
                    // A dead worker will never free space; give up rather
                    // than spin forever.
                    if self.shared.disabled.load(Ordering::Acquire) {
                        self.shared
                            .stats
                            .events_recorded
                            .fetch_sub(1, Ordering::Release);
                        return;
                    }
                    event = back;
                    self.shared
                        .stats
                        .enqueue_retries
                        .fetch_add(1, Ordering::Relaxed);
                    self.shared.retry.backoff(attempt);
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    fn reject_out_of_range(&self, e: crate::domain::AddressOutOfRange) {
        self.shared.stats.out_of_range.fetch_add(1, Ordering::Relaxed);
        warn!(error = %e, "trace event dropped");
    }
}
