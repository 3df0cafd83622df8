//! Binary log writer.

use std::io;

use crate::domain::{BaseAddressRecord, TraceEvent};
use crate::infrastructure::codec;
use crate::infrastructure::sink::TraceSink;

/// Serializes trace records and appends them to a sink.
///
/// The writer performs exactly one sink write per flushed batch: the whole
/// batch is encoded into a reused scratch buffer first, so a batch is either
/// appended in full or not at all. Failed writes are not retried; the worker
/// treats them as fatal for the trace stream.
#[derive(Debug)]
pub struct TraceWriter<S: TraceSink> {
    sink: S,
    scratch: Vec<u8>,
    base_written: bool,
}

impl<S: TraceSink> TraceWriter<S> {
    /// Wrap a sink.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            scratch: Vec::new(),
            base_written: false,
        }
    }

    /// Write the base-address record. Called exactly once, before any batch.
    ///
    /// # Errors
    ///
    /// Any sink error; the record may be partially durable and the trace
    /// stream must be considered dead.
    pub fn write_base_address(&mut self, record: BaseAddressRecord) -> io::Result<()> {
        debug_assert!(!self.base_written, "base address written twice");
        self.sink.write_all(&codec::encode_base_address(record))?;
        self.base_written = true;
        Ok(())
    }

    /// Append a batch of events as one contiguous write.
    ///
    /// # Errors
    ///
    /// Any sink error. No retry is attempted.
    pub fn write_batch(&mut self, events: &[TraceEvent]) -> io::Result<()> {
        debug_assert!(self.base_written, "batch written before base address");
        if events.is_empty() {
            return Ok(());
        }
        codec::encode_batch_into(events, &mut self.scratch);
        self.sink.write_all(&self.scratch)
    }

    /// Push buffered bytes toward durable storage.
    ///
    /// # Errors
    ///
    /// Any sink error.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    /// Unwrap the sink. Test helper for inspecting captured writes.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BaseAddress, BaseAddressRecord, TraceEvent};
    use crate::infrastructure::codec::{BASE_RECORD_LEN, EVENT_RECORD_LEN};
    use crate::infrastructure::sink::MemorySink;

    const BASE: BaseAddress = BaseAddress(0x1000_0000);

    #[test]
    fn base_record_precedes_events() {
        let mut writer = TraceWriter::new(MemorySink::new());
        writer
            .write_base_address(BaseAddressRecord::new(BASE))
            .unwrap();

        let events = [
            TraceEvent::allocation(BASE, 0x1000_0040, 64).unwrap(),
            TraceEvent::gc_mark(BASE, 0x1000_0040).unwrap(),
        ];
        writer.write_batch(&events).unwrap();

        let sink = writer.into_sink();
        let bytes = sink.bytes();
        assert_eq!(bytes.len(), BASE_RECORD_LEN + 2 * EVENT_RECORD_LEN);
        assert_eq!(bytes[0], 0); // base-address tag first
        assert_eq!(bytes[BASE_RECORD_LEN], 1); // then the allocation
    }

    #[test]
    fn one_write_per_batch() {
        let mut writer = TraceWriter::new(MemorySink::new());
        writer
            .write_base_address(BaseAddressRecord::new(BASE))
            .unwrap();

        let events: Vec<TraceEvent> = (0..10)
            .map(|i| TraceEvent::gc_mark(BASE, BASE.0 + i).unwrap())
            .collect();
        writer.write_batch(&events[..6]).unwrap();
        writer.write_batch(&events[6..]).unwrap();

        let sink = writer.into_sink();
        // One write for the base record, one per batch.
        assert_eq!(sink.writes().len(), 3);
        assert_eq!(sink.writes()[1].len(), 6 * EVENT_RECORD_LEN);
        assert_eq!(sink.writes()[2].len(), 4 * EVENT_RECORD_LEN);
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let mut writer = TraceWriter::new(MemorySink::new());
        writer
            .write_base_address(BaseAddressRecord::new(BASE))
            .unwrap();
        writer.write_batch(&[]).unwrap();

        assert_eq!(writer.into_sink().writes().len(), 1);
    }
}
