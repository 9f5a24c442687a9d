//! Node identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque unique identifier of one graph node.
///
/// A soul is never reused for a different logical entity, so it is safe to
/// merge every write that names it into the same node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Soul(String);

impl Soul {
    /// Wrap a soul string
    pub fn new(soul: impl Into<String>) -> Self {
        Self(soul.into())
    }

    /// Borrow the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty soul, which never names a node
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Soul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Soul {
    fn from(soul: &str) -> Self {
        Self::new(soul)
    }
}

impl From<String> for Soul {
    fn from(soul: String) -> Self {
        Self(soul)
    }
}
