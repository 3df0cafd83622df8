//! Bounded hand-off queue between producers and the persistence worker.
//!
//! The queue is the only shared mutable resource between the two roles.
//! Both operations are non-blocking and report status instead of suspending
//! the caller; retry behavior lives with the callers, not here.

use crossbeam_queue::ArrayQueue;

use crate::domain::TraceEvent;

/// Enqueue rejected because the queue is at capacity.
///
/// Carries the event back so the caller can retry without rebuilding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull(pub TraceEvent);

/// Fixed-capacity, lock-free hand-off queue for trace events.
///
/// Dequeue order matches enqueue order for any single producer thread. The
/// underlying ring tolerates concurrent producers, so multiple mutator
/// threads may share one queue; the single consumer is the persistence
/// worker.
#[derive(Debug)]
pub struct HandoffQueue {
    ring: ArrayQueue<TraceEvent>,
}

impl HandoffQueue {
    /// Create a queue holding at most `capacity` in-flight events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`crate::TracerConfig`] validates this
    /// before construction.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: ArrayQueue::new(capacity),
        }
    }

    /// Attempt to enqueue one event without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`QueueFull`] with the event when the queue is at capacity.
    #[inline]
    pub fn try_enqueue(&self, event: TraceEvent) -> Result<(), QueueFull> {
        self.ring.push(event).map_err(QueueFull)
    }

    /// Attempt to dequeue one event without blocking. `None` means empty.
    #[inline]
    pub fn try_dequeue(&self) -> Option<TraceEvent> {
        self.ring.pop()
    }

    /// Approximate number of in-flight events.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the queue currently holds no events.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Configured capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}
