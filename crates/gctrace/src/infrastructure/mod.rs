//! Infrastructure layer: external-technology integrations.
//!
//! Concrete queue, binary record codec and sink backends consumed by the
//! adapters. The domain layer never touches anything in here.

pub mod codec;
pub mod queue;
pub mod sink;

pub use queue::{HandoffQueue, QueueFull};
pub use sink::{FileSink, MemorySink, TraceSink};
