//! In-process GC event tracer.
//!
//! # Overview
//!
//! `gctrace` records allocation and mark events produced inside a garbage
//! collector and persists them to a compact binary log for offline analysis
//! (heap-behavior visualization, leak diagnosis). The producer side is meant
//! to be called from allocation and mark hot paths: it never performs file
//! I/O, never takes a lock, and never blocks on an OS wait primitive. A
//! dedicated background thread drains the hand-off queue, batches events and
//! appends them to the log file.
//!
//! ```text
//! ┌──────────────┐   try_enqueue   ┌──────────────┐   drain    ┌───────────┐
//! │ TracerHandle │ ──────────────► │ HandoffQueue │ ─────────► │ EventBatch│
//! │ (hot path)   │   busy-retry    │ (bounded)    │ busy-retry │ (1024)    │
//! └──────────────┘                 └──────────────┘            └─────┬─────┘
//!                                                          flush on  │
//!                                                          full/stop ▼
//!                                                          ┌───────────────┐
//!                                                          │ TraceWriter   │
//!                                                          │ → append file │
//!                                                          └───────────────┘
//! ```
//!
//! # Layers
//!
//! - [`domain`]: pure event model, batching and retry policy. No I/O.
//! - [`infrastructure`]: the bounded queue, the binary record codec and the
//!   sink backends.
//! - [`adapters`]: the persistence worker, the log writer, the offline
//!   reader and the [`Tracer`] composition root.
//!
//! # Usage
//!
//! ```no_run
//! use gctrace::{BaseAddress, Tracer, TracerConfig};
//!
//! let config = TracerConfig::new("gc_events.bin", BaseAddress(0x1000_0000));
//! let tracer = Tracer::init(config).expect("tracer init");
//! let handle = tracer.handle();
//!
//! // From allocation / mark paths, on any thread:
//! handle.record_allocation(0x1000_0040, 64);
//! handle.record_gc_mark(0x1000_0040);
//!
//! // At process teardown: drain the queue and flush the partial batch.
//! tracer.shutdown().expect("tracer shutdown");
//! ```
//!
//! # Failure model
//!
//! Tracing is a diagnostic side channel. Any unrecoverable I/O failure in
//! the worker degrades the tracer to a disabled state in which every
//! producer call returns immediately; it never propagates an error into the
//! instrumented program.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod infrastructure;

pub use adapters::{
    ReadError, StatsSnapshot, TraceError, TraceLog, TraceReader, TraceWriter, Tracer,
    TracerConfig, TracerHandle,
};
pub use domain::{
    AddressOutOfRange, BaseAddress, BaseAddressRecord, EventBatch, RetryPolicy, TraceEvent,
    TraceEventKind,
};
pub use infrastructure::{FileSink, HandoffQueue, MemorySink, QueueFull, TraceSink};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
