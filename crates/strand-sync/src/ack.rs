//! Acknowledgment aggregator.

use crate::engine::Engine;
use crate::fire::Waiter;
use strand_core::{ContextId, Message};

impl Engine {
    /// Count a sub-acknowledgment against the turn that spawned it.
    ///
    /// An error is recorded (first one wins), the ack is re-addressed to the
    /// batch so the requester sees it, and the turn fires without waiting for
    /// the rest. An ack naming a field of a context that has already retired
    /// is re-addressed to its batch as well.
    pub(crate) fn ack(&mut self, msg: &mut Message) {
        let Some(of) = msg.ack_of.clone() else {
            return;
        };
        let Some(id) = self.field_routes.get(&of).copied() else {
            if let Some(batch) = self.field_origins.get(&of) {
                tracing::debug!(field = %of, batch = %batch, "late ack traced back to batch");
                msg.ack_of = Some(batch.clone());
            }
            return;
        };
        let Some(ctx) = self.contexts.get_mut(&id) else {
            return;
        };
        ctx.acks += 1;
        if let Some(err) = msg.err.clone() {
            tracing::warn!(context = %id, batch = %ctx.batch, field = %of, error = %err, "sub-ack failed");
            msg.ack_of = Some(ctx.batch.clone());
            ctx.fail(err);
            self.fire(id);
        }
        let Some(ctx) = self.contexts.get_mut(&id) else {
            return;
        };
        if msg.ok.is_some() {
            ctx.ok = msg.ok;
        }
        if !ctx.stop && !ctx.crack {
            ctx.crack = true;
            let hatch = ctx.matched;
            if self.barrier.push(hatch, Waiter::Back(id)).is_err() {
                tracing::trace!(context = %id, "hatch already closed");
            }
        }
        self.back(id);
    }

    /// Settle a turn if it is complete: emit its terminal acknowledgment
    /// exactly once, then retire the context when nothing still needs it
    pub(crate) fn back(&mut self, id: ContextId) {
        let Some(ctx) = self.contexts.get_mut(&id) else {
            return;
        };
        if ctx.ready_to_settle() {
            ctx.settled = true;
            let ok = match ctx.err {
                Some(_) => None,
                None => Some(ctx.ok.unwrap_or(1)),
            };
            let settlement = Message::ack(ctx.batch.clone(), ctx.err.clone(), ok);
            tracing::debug!(
                context = %id,
                batch = %ctx.batch,
                acks = ctx.acks,
                all = ctx.all,
                failed = ctx.err.is_some(),
                "turn settled"
            );
            self.inbox.push_back(settlement);
        }
        if self.contexts.get(&id).is_some_and(|ctx| ctx.retirable()) {
            self.retire(id);
        }
    }
}
