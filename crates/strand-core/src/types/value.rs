//! Field values.

use super::Soul;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference from one node to another (a graph edge).
///
/// Encoded on the wire as `{"#": "<soul>"}` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Relation {
    /// Soul of the referenced node
    #[serde(rename = "#")]
    pub soul: Soul,
}

/// Value stored in a single node field.
///
/// Untagged on the wire so that values read exactly like plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Explicit null. Nulling a field is how data is "deleted".
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Numeric scalar
    Number(f64),
    /// Text scalar
    Text(String),
    /// Edge to another node
    Relation(Relation),
}

impl Value {
    /// Build a relation value pointing at `soul`
    pub fn relation(soul: impl Into<Soul>) -> Self {
        Self::Relation(Relation { soul: soul.into() })
    }

    /// Soul referenced by a relation value
    pub fn as_relation(&self) -> Option<&Soul> {
        match self {
            Self::Relation(rel) => Some(&rel.soul),
            _ => None,
        }
    }

    /// Text content of a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Canonical serialization used to break ties between equal states.
    ///
    /// Every replica computes the same string for the same value, so comparing
    /// these strings gives all replicas the same winner without coordination.
    pub fn lexical(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexical())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Self::Number(number as f64)
    }
}
