//! Wire format helpers.
//!
//! Peers exchange JSON using the short keys of [`Message`]. A frame holds a
//! single message or an array of them; an envelope additionally pins the
//! schema version for transports that batch.

use serde::{Deserialize, Serialize};
use strand_core::{Message, Result, SyncError};

/// Schema version written into every envelope
pub const WIRE_SCHEMA_VERSION: u16 = 1;

/// Versioned batch of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Schema version of the payload
    pub v: u16,
    /// Messages in send order
    pub msgs: Vec<Message>,
}

impl WireEnvelope {
    /// Envelope at the current schema version
    pub fn new(msgs: Vec<Message>) -> Self {
        Self {
            v: WIRE_SCHEMA_VERSION,
            msgs,
        }
    }
}

/// Encode one message
pub fn encode(msg: &Message) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(msg)?)
}

/// Decode one message
pub fn decode(bytes: &[u8]) -> Result<Message> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode a frame holding either one message or an array of messages
pub fn decode_frame(bytes: &[u8]) -> Result<Vec<Message>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Frame {
        Many(Vec<Message>),
        One(Box<Message>),
    }
    let frame: Frame = serde_json::from_slice(bytes)
        .map_err(|e| SyncError::serialization(format!("Invalid frame: {e}")))?;
    Ok(match frame {
        Frame::Many(msgs) => msgs,
        Frame::One(msg) => vec![*msg],
    })
}

/// Encode a versioned envelope
pub fn encode_envelope(msgs: Vec<Message>) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&WireEnvelope::new(msgs))?)
}

/// Decode a versioned envelope, rejecting unknown schema versions
pub fn decode_envelope(bytes: &[u8]) -> Result<Vec<Message>> {
    let envelope: WireEnvelope = serde_json::from_slice(bytes)?;
    if envelope.v != WIRE_SCHEMA_VERSION {
        return Err(SyncError::serialization(format!(
            "Unsupported wire schema version {} (expected {})",
            envelope.v, WIRE_SCHEMA_VERSION
        )));
    }
    Ok(envelope.msgs)
}
