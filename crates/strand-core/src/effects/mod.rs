//! Collaborator traits consumed by the sync core.
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `strand-effects` (production), `strand-testkit` (deterministic)
//! - **Usage**: `strand-sync` consumes them through an [`EffectSet`]
//!
//! All traits are synchronous: the engine is a single owner that never blocks,
//! and anything slow (storage, network) is fire-and-forget through the
//! [`EventBus`], with completion driven by acknowledgment messages.

pub mod bus;
pub mod dedup;
pub mod pending;
pub mod state;
pub mod validator;

pub use bus::{BusEvent, EventBus};
pub use dedup::DedupTracker;
pub use pending::PendingRegistry;
pub use state::StateEffects;
pub use validator::ValueValidator;

use std::sync::Arc;

/// Bundle of every collaborator the engine talks to
#[derive(Clone)]
pub struct EffectSet {
    /// Logical clock and CRDT field primitive
    pub state: Arc<dyn StateEffects>,
    /// Value-type validator
    pub validator: Arc<dyn ValueValidator>,
    /// At-most-once gate per message id
    pub dedup: Arc<dyn DedupTracker>,
    /// Outbound event routing
    pub bus: Arc<dyn EventBus>,
    /// Requests waiting for replies
    pub pending: Arc<dyn PendingRegistry>,
}

impl std::fmt::Debug for EffectSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectSet").finish_non_exhaustive()
    }
}
