//! Query responder: local-first reads, always forwarded to adapters.

use crate::engine::Engine;
use crate::scheduler::Task;
use std::collections::VecDeque;
use strand_core::{BusEvent, Graph, Message, MessageId, Node, Soul};

/// Where reply slices read their fields from
#[derive(Debug)]
enum ReplySource {
    /// The canonical node in the local graph; replies are trusted
    Graph,
    /// A synthesized copy (single-field projection)
    Detached(Node),
}

/// Remaining work of a reply that spans several slices
#[derive(Debug)]
pub(crate) struct ReplyCursor {
    /// Query being answered
    to: MessageId,
    soul: Soul,
    keys: VecDeque<String>,
    /// Id the next slice is sent under
    next_id: MessageId,
    source: ReplySource,
}

impl Engine {
    /// Answer a read from the local graph, then forward it to adapters.
    ///
    /// Absence locally never short-circuits a query.
    pub(crate) fn respond(&mut self, msg: &Message) {
        let (Some(query), Some(to)) = (msg.get.as_ref(), msg.id.clone()) else {
            return;
        };
        let first = self.fresh_id();
        let cursor = match (self.graph.get(&query.soul), query.field.as_deref()) {
            (None, _) => None,
            (Some(node), Some(field)) => node.project(field).map(|single| ReplyCursor {
                to: to.clone(),
                soul: query.soul.clone(),
                keys: single.keys().cloned().collect(),
                next_id: first,
                source: ReplySource::Detached(single),
            }),
            (Some(node), None) => Some(ReplyCursor {
                to: to.clone(),
                soul: query.soul.clone(),
                keys: node.keys().cloned().collect(),
                next_id: first,
                source: ReplySource::Graph,
            }),
        };
        match cursor {
            Some(cursor) => {
                tracing::debug!(soul = %query.soul, field = ?query.field, query = %to, "answering read locally");
                self.continue_reply(cursor);
            }
            None => {
                tracing::debug!(soul = %query.soul, field = ?query.field, query = %to, "read not held locally");
            }
        }
        self.effects.bus.emit(BusEvent::Get, msg.clone());
    }

    /// Emit one reply slice; schedule the next one if fields remain
    pub(crate) fn continue_reply(&mut self, mut cursor: ReplyCursor) {
        let node = match &cursor.source {
            ReplySource::Graph => self.graph.get(&cursor.soul),
            ReplySource::Detached(node) => Some(node),
        };
        let Some(node) = node else {
            return;
        };
        let mut slice = Node::new(cursor.soul.clone());
        for _ in 0..self.config.reply_slice {
            let Some(key) = cursor.keys.pop_front() else {
                break;
            };
            if let Some(value) = node.get(&key) {
                slice.set(key.clone(), node.state_of(&key), value.clone());
            }
        }
        let faith = matches!(cursor.source, ReplySource::Graph);
        let id = cursor.next_id.clone();
        let page = if cursor.keys.is_empty() {
            None
        } else {
            Some(self.fresh_id())
        };

        let mut reply = Message::put(Graph::from(slice))
            .with_id(id)
            .in_reply_to(cursor.to.clone());
        reply.page = page.clone();
        reply.local.faith = faith;
        self.inbox.push_back(reply);

        if let Some(next_id) = page {
            cursor.next_id = next_id;
            self.scheduler.schedule(Task::ResumeReply(cursor));
        }
    }
}
