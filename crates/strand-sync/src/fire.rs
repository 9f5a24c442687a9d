//! Completion barrier ("hatch"/"latch") and the fire step.
//!
//! Every turn opens a hatch and becomes the root's active one; the hatch that
//! was active before is remembered as the turn's latch. When a turn fires and
//! its hatch is still the active one, the latch is promoted if it is still
//! open, so overlapping turns hand the barrier back in order and callbacks
//! queued on it run once the whole chain has settled.

use crate::context::SettleCallback;
use crate::engine::Engine;
use crate::scheduler::Task;
use std::collections::HashMap;
use std::fmt;
use strand_core::{BusEvent, ContextId};

/// Identity of one hatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct HatchId(pub u64);

/// Work queued on a hatch, run on the tick after it fires
pub(crate) enum Waiter {
    /// Attempt settlement of a context
    Back(ContextId),
    /// Caller-supplied callback
    Callback(SettleCallback),
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Back(ctx) => f.debug_tuple("Back").field(ctx).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Open hatches of the root and which one is active
#[derive(Debug, Default)]
pub(crate) struct Barrier {
    open: HashMap<HatchId, Vec<Waiter>>,
    active: Option<HatchId>,
    next: u64,
}

impl Barrier {
    /// Open a hatch for a new turn: `(matched, latch)`
    pub fn open(&mut self) -> (HatchId, Option<HatchId>) {
        let id = HatchId(self.next);
        self.next += 1;
        self.open.insert(id, Vec::new());
        let latch = self.active.replace(id);
        (id, latch)
    }

    /// Currently active hatch
    pub fn active(&self) -> Option<HatchId> {
        self.active
    }

    /// Queue `waiter` on an open hatch; hands it back if the hatch is closed
    pub fn push(&mut self, hatch: HatchId, waiter: Waiter) -> Result<(), Waiter> {
        match self.open.get_mut(&hatch) {
            Some(waiters) => {
                waiters.push(waiter);
                Ok(())
            }
            None => Err(waiter),
        }
    }

    /// Close `matched`, reconcile the active hatch, return the released waiters
    pub fn close(&mut self, matched: HatchId, latch: Option<HatchId>) -> Vec<Waiter> {
        let waiters = self.open.remove(&matched).unwrap_or_default();
        if self.active == Some(matched) {
            self.active = latch.filter(|latch| self.open.contains_key(latch));
        }
        waiters
    }

    /// Number of hatches not yet closed
    #[cfg(test)]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

impl Engine {
    /// Fire a turn once its outstanding work reaches zero or it has failed.
    ///
    /// Idempotent: a fired context ignores further calls.
    pub(crate) fn fire(&mut self, id: ContextId) {
        let Some(ctx) = self.contexts.get_mut(&id) else {
            return;
        };
        if ctx.stop {
            return;
        }
        if ctx.err.is_none() {
            ctx.stun = ctx.stun.saturating_sub(1);
            if ctx.stun > 0 {
                return;
            }
        }
        ctx.stop = true;

        let report = ctx.report();
        let hook = ctx.hook.take();
        let (matched, latch) = (ctx.matched, ctx.latch);
        let rebroadcast = if ctx.err.is_none() && ctx.trigger.err.is_none() && !ctx.trigger.nts {
            let mut msg = ctx.trigger.clone();
            msg.local.context = None;
            msg.local.outward = true;
            Some(msg)
        } else {
            None
        };

        let waiters = self.barrier.close(matched, latch);
        tracing::debug!(
            context = %id,
            batch = %report.batch,
            accepted = report.accepted,
            waiters = waiters.len(),
            failed = report.err.is_some(),
            "turn fired"
        );
        if !waiters.is_empty() {
            self.scheduler.schedule(Task::Waiters(waiters));
        }
        if let Some(hook) = hook {
            hook(report);
        }
        if let Some(msg) = rebroadcast {
            self.effects.bus.emit(BusEvent::Out, msg);
        }
        self.back(id);
    }

    /// Run callbacks released by a fired hatch
    pub(crate) fn run_waiters(&mut self, waiters: Vec<Waiter>) {
        for waiter in waiters {
            match waiter {
                Waiter::Back(ctx) => self.back(ctx),
                Waiter::Callback(callback) => callback(),
            }
        }
    }
}
