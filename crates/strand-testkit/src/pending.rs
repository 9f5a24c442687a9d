//! Pending-request registry double.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use strand_core::{Message, MessageId, PendingRegistry};

/// Registry whose awaited ids are set by the test; delivered replies are kept
/// for inspection
#[derive(Debug, Default)]
pub struct RecordingPending {
    awaited: Mutex<BTreeSet<MessageId>>,
    delivered: Mutex<BTreeMap<MessageId, Vec<Message>>>,
}

impl RecordingPending {
    /// Registry awaiting nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Start awaiting replies to `id`
    pub fn await_reply(&self, id: impl Into<MessageId>) {
        self.awaited.lock().insert(id.into());
    }

    /// Stop awaiting replies to `id`
    pub fn release(&self, id: &MessageId) {
        self.awaited.lock().remove(id);
    }

    /// Replies delivered for `id`
    pub fn replies(&self, id: &MessageId) -> Vec<Message> {
        self.delivered.lock().get(id).cloned().unwrap_or_default()
    }
}

impl PendingRegistry for RecordingPending {
    fn is_awaited(&self, ack_of: Option<&MessageId>, message: &Message) -> bool {
        let Some(id) = ack_of else {
            return false;
        };
        if !self.awaited.lock().contains(id) {
            return false;
        }
        self.delivered
            .lock()
            .entry(id.clone())
            .or_default()
            .push(message.clone());
        true
    }
}
