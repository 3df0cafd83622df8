//! Fixed-capacity accumulation buffer for the persistence worker.

use super::event::TraceEvent;

/// Accumulates dequeued events until a full batch is ready to flush.
///
/// The backing storage is allocated once at construction and preserved
/// across [`clear`](EventBatch::clear) calls, so the worker loop never
/// reallocates.
#[derive(Debug)]
pub struct EventBatch {
    events: Vec<TraceEvent>,
    capacity: usize,
}

impl EventBatch {
    /// Create a batch buffer that flushes at `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut events = Vec::new();
        events.reserve_exact(capacity);
        Self { events, capacity }
    }

    /// Append one event. Returns `true` when the batch has just become full
    /// and must be flushed before the next push.
    #[inline]
    pub fn push(&mut self, event: TraceEvent) -> bool {
        debug_assert!(self.events.len() < self.capacity);
        self.events.push(event);
        self.events.len() == self.capacity
    }

    /// Number of buffered events.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether the batch is at capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.events.len() == self.capacity
    }

    /// Flush threshold this batch was built with.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The buffered events, in push order.
    #[inline]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Drop all buffered events, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
        debug_assert!(self.events.capacity() >= self.capacity);
    }
}
