//! Adapters layer: components wiring the domain to the infrastructure.
//!
//! The persistence worker and log writer form the consumer side of the
//! pipeline, the [`Tracer`] is the composition root owning both ends, and
//! the reader is the offline counterpart used by analysis tooling.

pub mod reader;
pub mod tracer;
pub mod worker;
pub mod writer;

pub use reader::{ReadError, TraceLog, TraceReader};
pub use tracer::{StatsSnapshot, TraceError, Tracer, TracerConfig, TracerHandle};
pub use writer::TraceWriter;
