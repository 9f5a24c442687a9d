//! # Strand Testkit
//!
//! Deterministic replacements for the production handlers plus shared
//! fixtures, so engine tests control time and observe every bus event.
//!
//! ```rust,ignore
//! let effects = TestEffects::at(1_000.0);
//! let mut engine = Engine::new(SyncConfig::default(), effects.effect_set());
//! engine.put(fixtures::graph_of(node("a", &[("name", "Alice".into(), 1.0)])));
//! assert!(effects.bus.count(BusEvent::Put) == 1);
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod bus;
pub mod clock;
pub mod fixtures;
pub mod pending;
pub mod storage;
pub mod strategies;

pub use bus::RecordingBus;
pub use clock::ManualClock;
pub use pending::RecordingPending;
pub use storage::LoopbackStore;

use std::sync::{Arc, Once};
use strand_core::EffectSet;
use strand_effects::{DedupCache, DefaultValidator};

/// Deterministic effect handlers with typed access for assertions
#[derive(Debug, Clone)]
pub struct TestEffects {
    /// Manually driven clock
    pub clock: Arc<ManualClock>,
    /// Bus recording every emitted event
    pub bus: Arc<RecordingBus>,
    /// Pending registry recording awaited replies
    pub pending: Arc<RecordingPending>,
    /// Real dedup cache; its window is wall-clock based but far longer than a test
    pub dedup: Arc<DedupCache>,
}

impl TestEffects {
    /// Handlers with the clock frozen at `now_ms`
    pub fn at(now_ms: f64) -> Self {
        Self {
            clock: Arc::new(ManualClock::new(now_ms)),
            bus: Arc::new(RecordingBus::new()),
            pending: Arc::new(RecordingPending::new()),
            dedup: Arc::new(DedupCache::new(10_000, 3_600_000)),
        }
    }

    /// Trait-object bundle for the engine
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

static TRACING: Once = Once::new();

/// Install a `fmt` subscriber honouring `RUST_LOG`, once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
