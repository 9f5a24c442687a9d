//! # Strand Effects - Production Handlers
//!
//! Stateful production implementations of the collaborator traits defined in
//! `strand-core`:
//!
//! - [`SystemClock`]: wall-clock [`StateEffects`](strand_core::StateEffects)
//!   with sub-millisecond steps so local states never repeat
//! - [`DefaultValidator`]: accepts well-formed values
//! - [`DedupCache`]: bounded, time-windowed message id cache
//! - [`ChannelBus`]: event bus backed by tokio channels
//! - [`PendingRequests`]: per-request reply channels
//!
//! Deterministic replacements for tests live in `strand-testkit`.

#![forbid(unsafe_code)]

pub mod bus;
pub mod clock;
pub mod dedup;
pub mod pending;
pub mod validator;

pub use bus::{BusDelivery, ChannelBus};
pub use clock::SystemClock;
pub use dedup::DedupCache;
pub use pending::PendingRequests;
pub use validator::DefaultValidator;

use std::sync::Arc;
use strand_core::{EffectSet, SyncConfig};
use tokio::sync::mpsc::UnboundedReceiver;

/// Production handlers, with typed access to the ones callers interact with
#[derive(Debug, Clone)]
pub struct ProductionEffects {
    /// Clock shared with the engine
    pub clock: Arc<SystemClock>,
    /// Dedup cache shared with the engine
    pub dedup: Arc<DedupCache>,
    /// Event bus, for registering additional subscribers
    pub bus: Arc<ChannelBus>,
    /// Pending-request registry, for registering local requests
    pub pending: Arc<PendingRequests>,
}

impl ProductionEffects {
    /// Build every production handler from `config`.
    ///
    /// Returns the handlers together with a receiver that observes every bus
    /// event, which is how transport and storage adapters attach.
    pub fn new(config: &SyncConfig) -> (Self, UnboundedReceiver<BusDelivery>) {
        let bus = Arc::new(ChannelBus::new());
        let events = bus.subscribe();
        let effects = Self {
            clock: Arc::new(SystemClock::with_drift(config.clock_drift_ms)),
            dedup: Arc::new(DedupCache::new(
                config.dedup_max_entries,
                config.dedup_max_age_ms,
            )),
            bus,
            pending: Arc::new(PendingRequests::new()),
        };
        (effects, events)
    }

    /// Trait-object bundle consumed by the engine
    pub fn effect_set(&self) -> EffectSet {
        EffectSet {
            state: self.clock.clone(),
            validator: Arc::new(DefaultValidator),
            dedup: self.dedup.clone(),
            bus: self.bus.clone(),
            pending: self.pending.clone(),
        }
    }
}
