//! Stderr progress listener for verbose runs.

use crate::event::{Event, EventType, Listener};
use crate::vlog;

/// Prints block-level pipeline events at verbosity 4 and up.
pub struct InfoListener;

impl InfoListener {
    pub fn new() -> Self {
        InfoListener
    }
}

impl Default for InfoListener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener for InfoListener {
    fn process_event(&self, event: &Event) {
        match event.event_type {
            EventType::BeforeTransform => {
                vlog!(5, "block {}: transform input {} bytes", event.block_id, event.size);
            }
            EventType::AfterTransform => {
                vlog!(5, "block {}: transform output {} bytes", event.block_id, event.size);
            }
            EventType::AfterEntropy => match event.hash {
                Some(h) => vlog!(
                    4,
                    "block {}: {} bytes emitted (checksum {:016x})",
                    event.block_id,
                    event.size,
                    h
                ),
                None => vlog!(4, "block {}: {} bytes emitted", event.block_id, event.size),
            },
            EventType::BlockInfo => {
                vlog!(4, "block {}: {} bytes decoded", event.block_id, event.size);
            }
            _ => {}
        }
    }
}
