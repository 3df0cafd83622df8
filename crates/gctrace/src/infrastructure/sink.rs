//! Sink backends for the log writer.
//!
//! The writer is generic over a [`TraceSink`], monomorphized per backend:
//! [`FileSink`] is the production append-mode file, [`MemorySink`] captures
//! writes in memory so tests can assert on exact write boundaries.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Destination for serialized trace records.
///
/// Implementations must complete each `write_all` fully or fail it; the
/// writer treats any error as fatal for the trace stream and never retries.
pub trait TraceSink {
    /// Append `bytes` in their entirety.
    ///
    /// # Errors
    ///
    /// Any I/O error. The caller stops tracing on failure.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Push buffered bytes toward durable storage.
    ///
    /// # Errors
    ///
    /// Any I/O error.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Append-mode file sink. The production backend.
#[derive(Debug)]
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Open (creating if needed) `path` for appending.
    ///
    /// The file is opened exactly once for the process lifetime of the
    /// tracer; the handle is owned by the persistence worker thereafter.
    ///
    /// # Errors
    ///
    /// Any error from opening or creating the file.
    pub fn open_append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl TraceSink for FileSink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// In-memory sink that records each `write_all` call separately.
///
/// Used by tests to observe batch atomicity: one flushed batch must arrive
/// as exactly one write.
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: Vec<Vec<u8>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The individual writes, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// All written bytes, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl TraceSink for MemorySink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writes.push(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_preserves_write_boundaries() {
        let mut sink = MemorySink::new();
        sink.write_all(&[1, 2]).unwrap();
        sink.write_all(&[3]).unwrap();

        assert_eq!(sink.writes().len(), 2);
        assert_eq!(sink.writes()[0], vec![1, 2]);
        assert_eq!(sink.bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn file_sink_appends_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sink.bin");

        let mut sink = FileSink::open_append(&path).unwrap();
        sink.write_all(&[0xaa, 0xbb]).unwrap();
        sink.write_all(&[0xcc]).unwrap();
        sink.flush().unwrap();
        drop(sink);

        assert_eq!(std::fs::read(&path).unwrap(), vec![0xaa, 0xbb, 0xcc]);
    }
}
