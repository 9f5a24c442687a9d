//! Event bus backed by tokio channels.

use parking_lot::Mutex;
use strand_core::{BusEvent, EventBus, Message};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// One event as seen by a subscriber
#[derive(Debug, Clone)]
pub struct BusDelivery {
    /// Event the message was emitted under
    pub event: BusEvent,
    /// Emitted message
    pub message: Message,
}

/// Fan-out bus: every subscriber receives every emitted event.
///
/// Emission never blocks; subscribers whose receiver was dropped are pruned on
/// the next emit.
#[derive(Debug, Default)]
pub struct ChannelBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

#[derive(Debug)]
struct Subscriber {
    filter: Option<Vec<BusEvent>>,
    sender: UnboundedSender<BusDelivery>,
}

impl ChannelBus {
    /// Bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event
    pub fn subscribe(&self) -> UnboundedReceiver<BusDelivery> {
        self.add(None)
    }

    /// Receive only the listed events (the consumer side of `bus.on`)
    pub fn on(&self, events: &[BusEvent]) -> UnboundedReceiver<BusDelivery> {
        self.add(Some(events.to_vec()))
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn add(&self, filter: Option<Vec<BusEvent>>) -> UnboundedReceiver<BusDelivery> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().push(Subscriber { filter, sender });
        receiver
    }
}

impl EventBus for ChannelBus {
    fn emit(&self, event: BusEvent, message: Message) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sub| !sub.sender.is_closed());
        for sub in subscribers.iter() {
            let wanted = sub
                .filter
                .as_ref()
                .map_or(true, |events| events.contains(&event));
            if wanted {
                let _ = sub.sender.send(BusDelivery {
                    event,
                    message: message.clone(),
                });
            }
        }
        tracing::trace!(%event, subscribers = subscribers.len(), "bus emit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::GetQuery;

    #[test]
    fn test_fan_out_and_filter() {
        let bus = ChannelBus::new();
        let mut all = bus.subscribe();
        let mut gets = bus.on(&[BusEvent::Get]);

        bus.emit(BusEvent::Out, Message::default());
        bus.emit(BusEvent::Get, Message::get(GetQuery::node("a")));

        assert_eq!(all.try_recv().unwrap().event, BusEvent::Out);
        assert_eq!(all.try_recv().unwrap().event, BusEvent::Get);
        assert_eq!(gets.try_recv().unwrap().event, BusEvent::Get);
        assert!(gets.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = ChannelBus::new();
        let receiver = bus.subscribe();
        drop(receiver);
        bus.emit(BusEvent::In, Message::default());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
