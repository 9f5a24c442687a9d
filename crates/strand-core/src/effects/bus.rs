//! Outbound event routing between the core and its adapters.

use crate::messages::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Events the sync core emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusEvent {
    /// Inbound data or acknowledgment ready for local consumers
    In,
    /// Message to rebroadcast to peers and transports
    Out,
    /// Read to delegate to storage/network adapters
    Get,
    /// Accepted single-field write to persist; adapters ack with the field id
    Put,
    /// Root initialization hook
    Create,
}

impl fmt::Display for BusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Get => "get",
            Self::Put => "put",
            Self::Create => "create",
        };
        f.write_str(name)
    }
}

/// Publish side of the generic event bus.
///
/// Emission is fire-and-forget: handlers that answer (storage acks, read
/// replies) do so by feeding new messages back into the dispatcher.
pub trait EventBus: Send + Sync {
    /// Publish `message` under `event`
    fn emit(&self, event: BusEvent, message: Message);
}
