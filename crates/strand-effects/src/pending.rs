//! Registry of local requests awaiting replies.

use parking_lot::Mutex;
use std::collections::HashMap;
use strand_core::{Message, MessageId, PendingRegistry};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Maps request ids to the channel their replies are delivered on.
///
/// A registration stays live until cancelled or until the receiver is
/// dropped, because reads can be answered by several sources.
#[derive(Debug, Default)]
pub struct PendingRequests {
    waiting: Mutex<HashMap<MessageId, UnboundedSender<Message>>>,
}

impl PendingRequests {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Await replies to `id`
    pub fn register(&self, id: MessageId) -> UnboundedReceiver<Message> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.waiting.lock().insert(id, sender);
        receiver
    }

    /// Stop awaiting replies to `id`
    pub fn cancel(&self, id: &MessageId) -> bool {
        self.waiting.lock().remove(id).is_some()
    }

    /// True while someone awaits `id`
    pub fn is_registered(&self, id: &MessageId) -> bool {
        self.waiting
            .lock()
            .get(id)
            .is_some_and(|sender| !sender.is_closed())
    }
}

impl PendingRegistry for PendingRequests {
    fn is_awaited(&self, ack_of: Option<&MessageId>, message: &Message) -> bool {
        let Some(id) = ack_of else {
            return false;
        };
        let mut waiting = self.waiting.lock();
        let delivered = match waiting.get(id) {
            Some(sender) => sender.send(message.clone()).is_ok(),
            None => return false,
        };
        if !delivered {
            waiting.remove(id);
            tracing::debug!(request = %id, "requester went away");
        }
        delivered
    }
}
