//! Offline trace log reader.
//!
//! The write side never needs this; it exists for analysis tooling and
//! tests. Reader contract: the base-address record must be loaded before
//! any event record is interpreted, which the fixed file layout makes
//! automatic.

use std::fmt;
use std::io;
use std::path::Path;

use crate::domain::{BaseAddress, BaseAddressRecord, TraceEvent};
use crate::infrastructure::codec::{self, CodecError, BASE_RECORD_LEN, EVENT_RECORD_LEN};

/// Failure while reading a trace log.
#[derive(Debug)]
pub enum ReadError {
    /// The file could not be read.
    Io(io::Error),
    /// The file contents do not parse as a trace log. Includes logs with a
    /// truncated trailing record.
    Codec(CodecError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read trace log: {e}"),
            Self::Codec(e) => write!(f, "malformed trace log: {e}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CodecError> for ReadError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// A fully parsed trace log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLog {
    /// The relativization origin, first record of the file.
    pub base: BaseAddressRecord,
    /// Event records in file (and therefore enqueue) order.
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    /// The origin as a typed base address.
    pub fn base_address(&self) -> BaseAddress {
        self.base.base()
    }

    /// Recompute the absolute address of one of this log's events.
    pub fn absolute_address(&self, event: &TraceEvent) -> u64 {
        event.absolute_address(self.base_address())
    }
}

/// Parses trace log files produced by the persistence worker.
#[derive(Debug)]
pub struct TraceReader;

impl TraceReader {
    /// Read and parse an entire trace log.
    ///
    /// # Errors
    ///
    /// [`ReadError::Io`] when the file cannot be read and
    /// [`ReadError::Codec`] when its contents are not a well-formed log
    /// (missing or misplaced base record, unknown kind tag, truncated
    /// trailing record).
    pub fn read_path(path: &Path) -> Result<TraceLog, ReadError> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Parse a trace log from raw bytes.
    ///
    /// # Errors
    ///
    /// [`ReadError::Codec`] as for [`read_path`](Self::read_path).
    pub fn parse(bytes: &[u8]) -> Result<TraceLog, ReadError> {
        let base = codec::decode_base_address(bytes)?;
        let body = &bytes[BASE_RECORD_LEN..];

        let mut events = Vec::with_capacity(body.len() / EVENT_RECORD_LEN);
        let mut chunks = body.chunks_exact(EVENT_RECORD_LEN);
        for chunk in &mut chunks {
            events.push(codec::decode_event(chunk)?);
        }
        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            return Err(CodecError::Truncated {
                expected: EVENT_RECORD_LEN,
                actual: remainder.len(),
            }
            .into());
        }

        Ok(TraceLog { base, events })
    }
}
