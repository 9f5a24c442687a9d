//! Message de-duplication.

use crate::messages::MessageId;

/// At-most-once gate per message id.
///
/// Bounds loop amplification across a gossip mesh: every message is processed
/// by a node at most once while its id is remembered.
pub trait DedupTracker: Send + Sync {
    /// True when `id` was already seen (refreshes its entry)
    fn check(&self, id: &MessageId) -> bool;

    /// Remember `id` as seen
    fn track(&self, id: &MessageId);
}
