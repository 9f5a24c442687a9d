//! Event bus that records everything emitted on it.

use parking_lot::Mutex;
use strand_core::{BusEvent, EventBus, Message};

/// Bus double: records `(event, message)` pairs in emission order
#[derive(Debug, Default)]
pub struct RecordingBus {
    events: Mutex<Vec<(BusEvent, Message)>>,
}

impl RecordingBus {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<(BusEvent, Message)> {
        self.events.lock().clone()
    }

    /// Messages recorded under `event`
    pub fn of(&self, event: BusEvent) -> Vec<Message> {
        self.events
            .lock()
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of messages recorded under `event`
    pub fn count(&self, event: BusEvent) -> usize {
        self.events.lock().iter().filter(|(e, _)| *e == event).count()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<(BusEvent, Message)> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Remove and return the messages recorded under `event`, keeping the rest
    pub fn take_of(&self, event: BusEvent) -> Vec<Message> {
        let mut events = self.events.lock();
        let (taken, kept): (Vec<_>, Vec<_>) = events.drain(..).partition(|(e, _)| *e == event);
        *events = kept;
        taken.into_iter().map(|(_, m)| m).collect()
    }

    /// Forget everything
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventBus for RecordingBus {
    fn emit(&self, event: BusEvent, message: Message) {
        self.events.lock().push((event, message));
    }
}
