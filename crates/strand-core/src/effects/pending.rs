//! Registry of local requests waiting for replies.

use crate::messages::{Message, MessageId};

/// "Is anyone still waiting for reply X?"
pub trait PendingRegistry: Send + Sync {
    /// True when a local requester awaits `ack_of`.
    ///
    /// Implementations hand `message` to that requester before returning, so
    /// an awaited reply is consumed locally rather than merged or queried.
    fn is_awaited(&self, ack_of: Option<&MessageId>, message: &Message) -> bool;
}
