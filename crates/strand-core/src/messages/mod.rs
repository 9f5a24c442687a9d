//! Messages exchanged between pipeline stages and peers.
//!
//! Wire keys are short (`#`, `@`, `%`); every hop of a gossip mesh
//! re-serializes them.

use crate::errors::SyncError;
use crate::graph::Graph;
use crate::types::{Node, Soul};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message identifier, unique per hop-originated message
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random alphanumeric id of `len` characters
    pub fn random<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let id: String = rng
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        Self(id)
    }

    /// Borrow the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id derived from this one by appending a sequence number
    pub fn child(&self, seq: u64) -> Self {
        Self(format!("{}{}", self.0, seq))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Local handle of a merge context. Never leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Read query: a whole node, or one field of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetQuery {
    /// Soul being read
    #[serde(rename = "#")]
    pub soul: Soul,
    /// Single field being read
    #[serde(rename = ".", default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl GetQuery {
    /// Query for a whole node
    pub fn node(soul: impl Into<Soul>) -> Self {
        Self {
            soul: soul.into(),
            field: None,
        }
    }

    /// Query for a single field
    pub fn field(soul: impl Into<Soul>, field: impl Into<String>) -> Self {
        Self {
            soul: soul.into(),
            field: Some(field.into()),
        }
    }
}

/// Process-local bookkeeping attached to a message; never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLocal {
    /// Merge context this message belongs to (per-field commit messages)
    pub context: Option<ContextId>,
    /// Set once this node has emitted the message outward; a message that
    /// comes back with the marker is forwarded without reprocessing
    pub outward: bool,
    /// Trusted payload, e.g. a reply built straight from the local graph
    pub faith: bool,
    /// Forced re-apply for cache-miss resync, even on stale or equal state
    pub miss: bool,
}

/// Unit of exchange between pipeline stages and peers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Message id; assigned by the dispatcher when absent
    #[serde(rename = "#", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Id of the message this one acknowledges
    #[serde(rename = "@", default, skip_serializing_if = "Option::is_none")]
    pub ack_of: Option<MessageId>,
    /// Partial graph to merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Graph>,
    /// Read query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<GetQuery>,
    /// Pagination id naming the next slice of a multi-slice reply
    #[serde(rename = "%", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<MessageId>,
    /// Error result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<SyncError>,
    /// Success marker; peers may report how many stores confirmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<u64>,
    /// Opaque diagnostics, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diag: Option<serde_json::Value>,
    /// Legacy "no spread" marker: process locally but never rebroadcast
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nts: bool,
    /// Local bookkeeping
    #[serde(skip)]
    pub local: MessageLocal,
}

impl Message {
    /// Write request carrying a partial graph
    pub fn put(graph: Graph) -> Self {
        Self {
            put: Some(graph),
            ..Self::default()
        }
    }

    /// Write request for a single node
    pub fn put_node(node: Node) -> Self {
        Self::put(Graph::from(node))
    }

    /// Read request
    pub fn get(query: GetQuery) -> Self {
        Self {
            get: Some(query),
            ..Self::default()
        }
    }

    /// Acknowledgment of `of`, carrying either an error or a success marker
    pub fn ack(of: MessageId, err: Option<SyncError>, ok: Option<u64>) -> Self {
        Self {
            ack_of: Some(of),
            err,
            ok,
            ..Self::default()
        }
    }

    /// Same message with an explicit id
    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Same message acknowledging `of`
    pub fn in_reply_to(mut self, of: MessageId) -> Self {
        self.ack_of = Some(of);
        self
    }

    /// True for a pure acknowledgment (names a message, carries no data)
    pub fn is_ack(&self) -> bool {
        self.ack_of.is_some() && self.put.is_none()
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
