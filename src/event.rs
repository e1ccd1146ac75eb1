//! Progress events emitted by the stream pipeline.
//!
//! Listener lists are snapshot-copied before block tasks are dispatched, so
//! user callbacks run without any pipeline lock held and may be invoked from
//! worker threads concurrently.

use std::sync::Arc;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    CompressionStart,
    BeforeTransform,
    AfterTransform,
    BeforeEntropy,
    AfterEntropy,
    CompressionEnd,
    DecompressionStart,
    DecompressionEnd,
    AfterHeaderDecoding,
    BlockInfo,
}

/// A single pipeline notification.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    /// Block the event refers to; 0 for stream-level events.
    pub block_id: i32,
    /// Byte count relevant to the event (block size, stream total, ...).
    pub size: i64,
    /// Block checksum when available.
    pub hash: Option<u64>,
}

impl Event {
    pub fn new(event_type: EventType, block_id: i32, size: i64) -> Self {
        Event { event_type, block_id, size, hash: None }
    }

    pub fn with_hash(event_type: EventType, block_id: i32, size: i64, hash: u64) -> Self {
        Event { event_type, block_id, size, hash: Some(hash) }
    }
}

/// Receives pipeline notifications. Implementations must tolerate concurrent
/// invocation from several worker threads.
pub trait Listener: Send + Sync {
    fn process_event(&self, event: &Event);
}

/// Shared, snapshot-friendly listener handle.
pub type ListenerRef = Arc<dyn Listener>;

/// Delivers `event` to every listener in `listeners`.
pub(crate) fn notify(listeners: &[ListenerRef], event: &Event) {
    for l in listeners {
        l.process_event(event);
    }
}
