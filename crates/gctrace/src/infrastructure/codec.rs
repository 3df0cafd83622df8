//! Binary record layout.
//!
//! Records are fixed-size and self-framing: a one-byte kind tag, explicit
//! zero padding, then little-endian fields. The layout is identical on
//! every host so a log written anywhere can be decoded anywhere.
//!
//! | record            | size | layout                                              |
//! |-------------------|------|-----------------------------------------------------|
//! | base address      | 16   | `kind:u8`, 7 pad bytes, `absolute_address:u64 LE`   |
//! | trace event       | 12   | `kind:u8`, 3 pad bytes, `relative:u32 LE`, `size:u32 LE` |

use std::fmt;

use crate::domain::{BaseAddressRecord, TraceEvent, TraceEventKind};

/// Serialized size of the base-address record.
pub const BASE_RECORD_LEN: usize = 16;

/// Serialized size of one trace event record.
pub const EVENT_RECORD_LEN: usize = 12;

/// Decoding failure for a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes than one full record.
    Truncated {
        /// Bytes a full record needs.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },
    /// The kind tag is outside the closed set.
    UnknownKind(u8),
    /// A structurally valid record of the wrong kind for this position,
    /// e.g. a base-address tag in the event stream.
    UnexpectedKind(TraceEventKind),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { expected, actual } => {
                write!(f, "truncated record: expected {expected} bytes, got {actual}")
            }
            Self::UnknownKind(tag) => write!(f, "unknown record kind tag {tag}"),
            Self::UnexpectedKind(kind) => write!(f, "unexpected {kind} record"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Encode the base-address record into its 16-byte image.
pub fn encode_base_address(record: BaseAddressRecord) -> [u8; BASE_RECORD_LEN] {
    let mut out = [0u8; BASE_RECORD_LEN];
    out[0] = TraceEventKind::BaseAddress.tag();
    out[8..16].copy_from_slice(&record.absolute_address.to_le_bytes());
    out
}

/// Encode one event into its 12-byte image.
pub fn encode_event(event: TraceEvent) -> [u8; EVENT_RECORD_LEN] {
    let mut out = [0u8; EVENT_RECORD_LEN];
    out[0] = event.kind.tag();
    out[4..8].copy_from_slice(&event.relative_address.to_le_bytes());
    out[8..12].copy_from_slice(&event.size.to_le_bytes());
    out
}

/// Encode a whole batch contiguously into `out`, replacing its contents.
///
/// The buffer is cleared, not reallocated, when its capacity already covers
/// the batch; the worker reuses one scratch buffer across flushes.
pub fn encode_batch_into(events: &[TraceEvent], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(events.len() * EVENT_RECORD_LEN);
    for event in events {
        out.extend_from_slice(&encode_event(*event));
    }
}

/// Decode the base-address record from the head of `bytes`.
///
/// # Errors
///
/// [`CodecError::Truncated`] when fewer than [`BASE_RECORD_LEN`] bytes are
/// available, [`CodecError::UnknownKind`] for a tag outside the closed set,
/// and [`CodecError::UnexpectedKind`] when the head is not a base record.
pub fn decode_base_address(bytes: &[u8]) -> Result<BaseAddressRecord, CodecError> {
    if bytes.len() < BASE_RECORD_LEN {
        return Err(CodecError::Truncated {
            expected: BASE_RECORD_LEN,
            actual: bytes.len(),
        });
    }
    let kind = TraceEventKind::from_tag(bytes[0]).ok_or(CodecError::UnknownKind(bytes[0]))?;
    if kind != TraceEventKind::BaseAddress {
        return Err(CodecError::UnexpectedKind(kind));
    }
    let mut address = [0u8; 8];
    address.copy_from_slice(&bytes[8..16]);
    Ok(BaseAddressRecord {
        absolute_address: u64::from_le_bytes(address),
    })
}

/// Decode one event record from the head of `bytes`.
///
/// # Errors
///
/// [`CodecError::Truncated`] when fewer than [`EVENT_RECORD_LEN`] bytes are
/// available, [`CodecError::UnknownKind`] for a tag outside the closed set,
/// and [`CodecError::UnexpectedKind`] for a base-address tag in the event
/// stream (which indicates a desynchronized or corrupt file).
pub fn decode_event(bytes: &[u8]) -> Result<TraceEvent, CodecError> {
    if bytes.len() < EVENT_RECORD_LEN {
        return Err(CodecError::Truncated {
            expected: EVENT_RECORD_LEN,
            actual: bytes.len(),
        });
    }
    let kind = TraceEventKind::from_tag(bytes[0]).ok_or(CodecError::UnknownKind(bytes[0]))?;
    if kind == TraceEventKind::BaseAddress {
        return Err(CodecError::UnexpectedKind(kind));
    }
    let mut relative = [0u8; 4];
    relative.copy_from_slice(&bytes[4..8]);
    let mut size = [0u8; 4];
    size.copy_from_slice(&bytes[8..12]);
    Ok(TraceEvent {
        kind,
        relative_address: u32::from_le_bytes(relative),
        size: u32::from_le_bytes(size),
    })
}
