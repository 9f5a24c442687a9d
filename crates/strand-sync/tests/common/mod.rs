//! Shared harness: an engine wired to deterministic handlers and a loopback
//! storage adapter.

#![allow(dead_code)]

use strand_core::{BusEvent, Graph, Message, MessageId, Node, Soul, SyncConfig, Value};
use strand_sync::Engine;
use strand_testkit::{LoopbackStore, TestEffects};

/// Clock reading every harness starts at
pub const NOW: f64 = 1_000.0;

pub struct Harness {
    pub engine: Engine,
    pub effects: TestEffects,
    pub store: LoopbackStore,
    /// Every event the storage adapter has consumed
    pub handled: Vec<(BusEvent, Message)>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        strand_testkit::init_tracing();
        let effects = TestEffects::at(NOW);
        let engine = Engine::new(config, effects.effect_set()).with_seed(7);
        Self {
            engine,
            effects,
            store: LoopbackStore::new(),
            handled: Vec::new(),
        }
    }

    /// Hand pending `put`/`get` events to the storage adapter and feed its
    /// answers back; returns how many answers were ingested
    pub fn pump(&mut self) -> usize {
        let mut events: Vec<(BusEvent, Message)> = self
            .effects
            .bus
            .take_of(BusEvent::Put)
            .into_iter()
            .map(|msg| (BusEvent::Put, msg))
            .collect();
        events.extend(
            self.effects
                .bus
                .take_of(BusEvent::Get)
                .into_iter()
                .map(|msg| (BusEvent::Get, msg)),
        );
        let answers = self.store.handle_all(&events);
        self.handled.extend(events);
        let count = answers.len();
        for answer in answers {
            self.engine.ingest(answer);
        }
        count
    }

    /// Run scheduled work and storage round trips until both are quiet
    pub fn settle(&mut self) {
        for _ in 0..100 {
            let ran = self.engine.run_until_idle();
            let answered = self.pump();
            if ran == 0 && answered == 0 {
                return;
            }
        }
        panic!("engine did not settle");
    }

    /// Messages acknowledging `id` that reached local consumers
    pub fn acks_for(&self, id: &MessageId) -> Vec<Message> {
        self.effects
            .bus
            .of(BusEvent::In)
            .into_iter()
            .filter(|msg| msg.is_ack() && msg.ack_of.as_ref() == Some(id))
            .collect()
    }

    /// Messages rebroadcast to peers
    pub fn outbound(&self) -> Vec<Message> {
        self.effects.bus.of(BusEvent::Out)
    }

    /// Stored value of a field
    pub fn value(&self, soul: &str, field: &str) -> Option<Value> {
        self.engine
            .graph()
            .get(&Soul::new(soul))
            .and_then(|node| node.get(field))
            .cloned()
    }

    /// Stored state of a field
    pub fn state(&self, soul: &str, field: &str) -> f64 {
        self.engine
            .graph()
            .get(&Soul::new(soul))
            .map_or(f64::NEG_INFINITY, |node| node.state_of(field).as_f64())
    }
}

/// Batch with one field write
pub fn write(soul: &str, field: &str, value: impl Into<Value>, state: f64) -> Graph {
    Graph::from(Node::new(soul).with(field, value, state))
}
