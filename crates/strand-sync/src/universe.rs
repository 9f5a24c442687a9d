//! Dispatcher: the entry point every message passes through.

use crate::engine::Engine;
use strand_core::{BusEvent, Message};

/// What the dispatcher did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Id already seen; dropped
    Duplicate,
    /// Message this node itself sent outward; forwarded to local consumers only
    Echo,
    /// Reply handed to a local requester that was waiting for it
    Delivered,
    /// Write batch handed to the committer
    Write,
    /// Read answered locally and forwarded to adapters
    Read,
    /// Acknowledgment counted, then relayed
    Acknowledged,
    /// Nothing to process locally; relayed
    Relayed,
}

impl Engine {
    /// Route one message through the pipeline
    pub(crate) fn universe(&mut self, mut msg: Message) -> DispatchOutcome {
        let id = match msg.id.clone() {
            Some(id) => id,
            None => {
                let id = self.fresh_id();
                msg.id = Some(id.clone());
                id
            }
        };
        if self.effects.dedup.check(&id) {
            tracing::trace!(message = %id, "duplicate dropped");
            return DispatchOutcome::Duplicate;
        }
        self.effects.dedup.track(&id);

        if msg.local.outward {
            self.effects.bus.emit(BusEvent::In, msg);
            return DispatchOutcome::Echo;
        }

        let mut outcome = DispatchOutcome::Relayed;
        if msg.is_ack() {
            self.ack(&mut msg);
            outcome = DispatchOutcome::Acknowledged;
        }
        if self.effects.pending.is_awaited(msg.ack_of.as_ref(), &msg) {
            tracing::debug!(message = %id, reply_to = ?msg.ack_of, "delivered to requester");
            outcome = DispatchOutcome::Delivered;
        } else if msg.put.is_some() {
            tracing::debug!(message = %id, reply_to = ?msg.ack_of, "write");
            self.put_batch(msg);
            return DispatchOutcome::Write;
        } else if msg.get.is_some() {
            self.respond(&msg);
            outcome = DispatchOutcome::Read;
        }

        self.effects.bus.emit(BusEvent::In, msg.clone());
        if msg.nts {
            return outcome;
        }
        msg.local.outward = true;
        self.effects.bus.emit(BusEvent::Out, msg);
        outcome
    }
}
