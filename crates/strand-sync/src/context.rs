//! Per-turn bookkeeping for one write batch.

use crate::fire::HatchId;
use std::fmt;
use strand_core::{Message, MessageId, SyncError};

/// Hook invoked once when a turn fires
pub type TurnHook = Box<dyn FnOnce(TurnReport) + Send>;

/// Callback piggy-backed on the active completion barrier
pub type SettleCallback = Box<dyn FnOnce() + Send>;

/// What a turn hook is told about its turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Id of the batch message
    pub batch: MessageId,
    /// Fields accepted by HAM so far
    pub accepted: u64,
    /// First error recorded on the batch
    pub err: Option<SyncError>,
}

/// Merge context of one locally processed write batch ("turn").
///
/// `stun` starts at 1 so the turn cannot fire before its batch is fully
/// enumerated; every accepted field adds one and its commit removes it.
/// Settlement additionally waits for one acknowledgment per accepted field and
/// for every deferred future-state write to resolve.
pub(crate) struct MergeContext {
    /// Id of the triggering message, also the prefix of every field id
    pub batch: MessageId,
    /// Triggering message; its payload is kept current by `map`
    pub trigger: Message,
    /// Outstanding sub-operations gating the fire
    pub stun: u64,
    /// Sub-operations spawned (accepted fields)
    pub all: u64,
    /// Sub-acknowledgments received
    pub acks: u64,
    /// Future-state writes waiting on a timer
    pub deferred: u64,
    /// First error recorded
    pub err: Option<SyncError>,
    /// Last success marker reported by a sub-ack
    pub ok: Option<u64>,
    /// Trusted replay
    pub faith: bool,
    /// Forced re-apply
    pub miss: bool,
    /// Fired; terminal for the barrier
    pub stop: bool,
    /// A settlement attempt is already queued on the barrier
    pub crack: bool,
    /// Terminal acknowledgment emitted
    pub settled: bool,
    /// Hatch opened by this turn
    pub matched: HatchId,
    /// Hatch that was active when this turn started
    pub latch: Option<HatchId>,
    /// Field ids routed to this context
    pub fields: Vec<MessageId>,
    /// Custom completion hook
    pub hook: Option<TurnHook>,
}

impl MergeContext {
    pub fn new(trigger: Message, batch: MessageId, matched: HatchId, latch: Option<HatchId>) -> Self {
        Self {
            batch,
            faith: trigger.local.faith,
            miss: trigger.local.miss,
            trigger,
            stun: 1,
            all: 0,
            acks: 0,
            deferred: 0,
            err: None,
            ok: None,
            stop: false,
            crack: false,
            settled: false,
            matched,
            latch,
            fields: Vec::new(),
            hook: None,
        }
    }

    /// Record an error unless one is already present
    pub fn fail(&mut self, err: SyncError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// True once the turn can emit its terminal acknowledgment
    pub fn ready_to_settle(&self) -> bool {
        if self.settled {
            return false;
        }
        self.err.is_some() || (self.stop && self.deferred == 0 && self.acks >= self.all)
    }

    /// True once nothing can reference this context any more
    pub fn retirable(&self) -> bool {
        self.settled && self.deferred == 0
    }

    /// Waiting only on acknowledgments that may never come
    pub fn evictable(&self) -> bool {
        self.stop && self.deferred == 0
    }

    pub fn report(&self) -> TurnReport {
        TurnReport {
            batch: self.batch.clone(),
            accepted: self.all,
            err: self.err.clone(),
        }
    }
}

impl fmt::Debug for MergeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeContext")
            .field("batch", &self.batch)
            .field("stun", &self.stun)
            .field("all", &self.all)
            .field("acks", &self.acks)
            .field("deferred", &self.deferred)
            .field("err", &self.err)
            .field("stop", &self.stop)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}
