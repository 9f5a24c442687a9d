//! In-memory storage adapter that answers the engine's bus events.

use parking_lot::Mutex;
use strand_core::{BusEvent, Graph, Message, MessageId, Node, SyncError};

/// Storage adapter double.
///
/// Persists field writes announced on [`BusEvent::Put`] and answers every one
/// with an acknowledgment naming the field id; answers [`BusEvent::Get`] from
/// what it has stored. Replies are returned to the caller, which feeds them
/// back into the engine the way a real adapter would.
#[derive(Debug, Default)]
pub struct LoopbackStore {
    stored: Mutex<Graph>,
    failure: Mutex<Option<String>>,
}

impl LoopbackStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `graph`
    pub fn with_graph(graph: Graph) -> Self {
        Self {
            stored: Mutex::new(graph),
            failure: Mutex::new(None),
        }
    }

    /// Acknowledge every following write with this error
    pub fn fail_writes(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    /// Copy of everything persisted
    pub fn stored(&self) -> Graph {
        self.stored.lock().clone()
    }

    /// Handle one bus event, returning the messages the adapter sends back
    pub fn handle(&self, event: BusEvent, message: &Message) -> Option<Message> {
        match event {
            BusEvent::Put => self.persist(message),
            BusEvent::Get => self.answer(message),
            _ => None,
        }
    }

    /// Handle a batch of recorded events in order
    pub fn handle_all(&self, events: &[(BusEvent, Message)]) -> Vec<Message> {
        events
            .iter()
            .filter_map(|(event, message)| self.handle(*event, message))
            .collect()
    }

    fn persist(&self, message: &Message) -> Option<Message> {
        let id = message.id.clone()?;
        if let Some(reason) = self.failure.lock().clone() {
            return Some(Message::ack(id, Some(SyncError::remote_ack(reason)), None));
        }
        let put = message.put.as_ref()?;
        let mut stored = self.stored.lock();
        for (soul, node) in put.iter() {
            if !stored.contains(soul) {
                stored.insert(soul.clone(), Node::new(soul.clone()));
            }
            let entry = stored.get_mut(soul)?;
            for (field, value) in &node.fields {
                entry.set(field.clone(), node.state_of(field), value.clone());
            }
        }
        Some(Message::ack(id, None, Some(1)))
    }

    fn answer(&self, message: &Message) -> Option<Message> {
        let id: MessageId = message.id.clone()?;
        let query = message.get.as_ref()?;
        let stored = self.stored.lock();
        let node = stored.get(&query.soul)?;
        let node = match &query.field {
            Some(field) => node.project(field)?,
            None => node.clone(),
        };
        Some(Message::put_node(node).in_reply_to(id))
    }
}
