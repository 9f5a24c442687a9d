//! Batch committer: validates a write batch and walks it through HAM.

use crate::engine::Engine;
use crate::ham::{self, HamDecision, HamInput};
use crate::scheduler::Task;
use std::collections::VecDeque;
use strand_core::{
    BusEvent, ContextId, Graph, Message, MessageLocal, Node, Soul, State, SyncError, Value,
};

/// One candidate field write taken from a batch
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldWrite {
    pub soul: Soul,
    pub field: String,
    pub value: Value,
    pub state: State,
}

impl FieldWrite {
    /// Single-field graph carrying this write
    fn graph(&self) -> Graph {
        Graph::from(Node::new(self.soul.clone()).with(
            self.field.clone(),
            self.value.clone(),
            self.state,
        ))
    }
}

/// Position inside a batch between slices
#[derive(Debug)]
pub(crate) struct PutCursor {
    souls: VecDeque<Soul>,
    current: Option<SoulCursor>,
}

#[derive(Debug)]
struct SoulCursor {
    soul: Soul,
    node: Node,
    fields: VecDeque<String>,
}

impl PutCursor {
    fn new(payload: &Graph) -> Self {
        Self {
            souls: payload.souls().cloned().collect(),
            current: None,
        }
    }
}

/// Structural checks on one soul entry of a batch
fn check_node(soul: &Soul, node: &Node) -> Result<(), SyncError> {
    let Some(meta) = node.meta.as_ref() else {
        return Err(SyncError::validation(format!("Invalid data: {soul} no meta.")));
    };
    if meta.soul.as_ref() != Some(soul) {
        return Err(SyncError::validation(format!("Invalid data: {soul} soul not same.")));
    }
    if meta.states.is_none() {
        return Err(SyncError::validation(format!("Invalid data: {soul} no state.")));
    }
    Ok(())
}

impl Engine {
    /// Entry point for a write batch routed by the dispatcher
    pub(crate) fn put_batch(&mut self, msg: Message) {
        if msg.ack_of.is_some() && msg.local.faith && !msg.local.miss {
            // Trusted reply built from a replica's own graph: relay as is.
            let mut msg = msg;
            msg.local.outward = true;
            self.effects.bus.emit(BusEvent::Out, msg);
            return;
        }
        let Some(batch) = msg.id.clone() else {
            return;
        };
        let cursor = match msg.put.as_ref() {
            Some(payload) => PutCursor::new(payload),
            None => return,
        };
        let ctx = self.open_context(msg, batch.clone());
        tracing::debug!(context = %ctx, batch = %batch, souls = cursor.souls.len(), "put batch");
        self.continue_put(ctx, cursor);
    }

    /// Process up to `put_slice` fields, then yield to the scheduler
    pub(crate) fn continue_put(&mut self, ctx: ContextId, mut cursor: PutCursor) {
        let mut budget = self.config.put_slice;
        loop {
            if self.failed(ctx) {
                return;
            }
            let exhausted = cursor
                .current
                .as_ref()
                .map_or(true, |current| current.fields.is_empty());
            if exhausted {
                let Some(soul) = cursor.souls.pop_front() else {
                    self.fire(ctx);
                    return;
                };
                match self.enter_soul(ctx, soul) {
                    Some(next) => cursor.current = Some(next),
                    None => return,
                }
                continue;
            }
            if budget == 0 {
                self.scheduler.schedule(Task::ResumePut { ctx, cursor });
                return;
            }
            let Some(current) = cursor.current.as_mut() else {
                continue;
            };
            let Some(field) = current.fields.pop_front() else {
                continue;
            };
            budget -= 1;
            let value = current.node.fields.get(&field).cloned().unwrap_or(Value::Null);
            let state = current.node.states().and_then(|states| states.get(&field)).copied();
            let soul = current.soul.clone();
            match self.check_field(&soul, &field, &value, state) {
                Ok(state) => self.ham(ctx, FieldWrite { soul, field, value, state }),
                Err(err) => {
                    self.reject(ctx, err);
                    return;
                }
            }
        }
    }

    /// Start on the next soul of a batch; rejects the batch if it is malformed
    fn enter_soul(&mut self, ctx: ContextId, soul: Soul) -> Option<SoulCursor> {
        let node = self
            .contexts
            .get(&ctx)?
            .trigger
            .put
            .as_ref()
            .and_then(|payload| payload.get(&soul))
            .cloned();
        let Some(node) = node else {
            self.reject(ctx, SyncError::validation(format!("Invalid data: {soul} no node.")));
            return None;
        };
        if let Err(err) = check_node(&soul, &node) {
            self.reject(ctx, err);
            return None;
        }
        Some(SoulCursor {
            fields: node.keys().cloned().collect(),
            soul,
            node,
        })
    }

    fn check_field(
        &self,
        soul: &Soul,
        field: &str,
        value: &Value,
        state: Option<State>,
    ) -> Result<State, SyncError> {
        let Some(state) = state.filter(|state| state.is_finite()) else {
            return Err(SyncError::validation(format!(
                "Invalid data: {field} on {soul} no state."
            )));
        };
        if !self.effects.validator.is_valid(value) {
            return Err(SyncError::validation(format!(
                "Invalid data: {field} on {soul} bad {value}"
            )));
        }
        Ok(state)
    }

    fn failed(&self, ctx: ContextId) -> bool {
        self.contexts.get(&ctx).map_or(true, |ctx| ctx.err.is_some())
    }

    /// Record a validation failure on the batch and fire it.
    ///
    /// Fields committed before the failure stay committed.
    fn reject(&mut self, id: ContextId, err: SyncError) {
        let Some(ctx) = self.contexts.get_mut(&id) else {
            return;
        };
        tracing::warn!(context = %id, batch = %ctx.batch, error = %err, "rejecting put batch");
        ctx.trigger.err.get_or_insert_with(|| err.clone());
        ctx.fail(err);
        self.fire(id);
    }

    /// Run the HAM rule for one field and act on its decision
    pub(crate) fn ham(&mut self, id: ContextId, write: FieldWrite) {
        let Some(ctx) = self.contexts.get(&id) else {
            return;
        };
        let node = self.graph.get(&write.soul);
        let now = self.effects.state.now();
        let input = HamInput {
            now,
            state: write.state,
            was: self.effects.state.state_of(node, &write.field),
            value: &write.value,
            known: node.and_then(|node| node.get(&write.field)),
            faith: ctx.faith,
            miss: ctx.miss,
            max_defer_ms: self.config.max_defer_ms,
        };
        let decision = ham::decide(&input);
        tracing::trace!(
            soul = %write.soul,
            field = %write.field,
            state = %write.state,
            ?decision,
            "ham"
        );
        match decision {
            HamDecision::Accept => self.accept(id, write),
            HamDecision::Stale | HamDecision::Tie => {}
            HamDecision::Defer { delay_ms } => {
                if let Some(ctx) = self.contexts.get_mut(&id) {
                    ctx.deferred += 1;
                }
                let deadline = now.plus_millis(delay_ms as f64);
                self.scheduler.schedule_at(deadline, Task::Ham { ctx: id, write });
            }
        }
    }

    /// Timer for a deferred write came due
    pub(crate) fn retry_ham(&mut self, id: ContextId, write: FieldWrite) {
        match self.contexts.get_mut(&id) {
            Some(ctx) => ctx.deferred = ctx.deferred.saturating_sub(1),
            None => return,
        }
        self.ham(id, write);
        self.back(id);
    }

    /// Count an accepted field, give it an id, and commit it
    fn accept(&mut self, id: ContextId, write: FieldWrite) {
        let Some(ctx) = self.contexts.get_mut(&id) else {
            return;
        };
        ctx.stun += 1;
        let field_id = ctx.batch.child(ctx.all);
        ctx.all += 1;
        ctx.fields.push(field_id.clone());
        let batch = ctx.batch.clone();
        let msg = Message {
            id: Some(field_id.clone()),
            ack_of: ctx.trigger.ack_of.clone(),
            put: Some(write.graph()),
            ok: ctx.trigger.ok,
            local: MessageLocal {
                context: Some(id),
                ..MessageLocal::default()
            },
            ..Message::default()
        };
        self.effects.dedup.track(&field_id);
        self.field_routes.insert(field_id.clone(), id);
        self.remember_origin(field_id, batch);
        self.map(msg, write);
    }

    /// Commit one accepted field: refresh the batch's own view, merge into the
    /// graph, notify subscribers, fire the turn, hand the write to storage
    pub(crate) fn map(&mut self, msg: Message, write: FieldWrite) {
        let Some(id) = msg.local.context else {
            return;
        };
        let FieldWrite {
            soul,
            field,
            value,
            state,
        } = write;
        if let Some(view) = self
            .contexts
            .get_mut(&id)
            .and_then(|ctx| ctx.trigger.put.as_mut())
            .and_then(|payload| payload.get_mut(&soul))
        {
            view.set(field.clone(), state, value.clone());
        }

        let was = self.effects.state.state_of(self.graph.get(&soul), &field);
        if state >= was {
            let created = !self.graph.contains(&soul);
            let node = self.graph.take(&soul);
            let merged = self
                .effects
                .state
                .merge_field(node, &field, state, value, &soul);
            self.graph.insert(soul.clone(), merged);
            tracing::debug!(soul = %soul, field = %field, state = %state, created, "field committed");
        } else {
            // Forced resync of an older write: announce it, never regress the replica.
            tracing::debug!(soul = %soul, field = %field, state = %state, "forced write older than replica");
        }

        self.notify(&soul, &msg);
        self.fire(id);
        self.effects.bus.emit(BusEvent::Put, msg);
    }
}
