//! Graph nodes and their per-field state metadata.

use super::{Soul, State, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata block of a node (`"_"` on the wire).
///
/// Both members are optional so that a malformed inbound node can still be
/// represented and rejected by the batch committer instead of failing the
/// whole message at decode time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Soul this node belongs to
    #[serde(rename = "#", default, skip_serializing_if = "Option::is_none")]
    pub soul: Option<Soul>,
    /// State at which each field was last written
    #[serde(rename = ">", default, skip_serializing_if = "Option::is_none")]
    pub states: Option<BTreeMap<String, State>>,
}

/// A node: field values plus the state each field was written at.
///
/// Nodes held in the local graph always carry metadata whose state map has
/// exactly the same keys as `fields`. Partial nodes inside a `put` payload
/// come from the network and are checked before use.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    /// Metadata block
    #[serde(rename = "_", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<NodeMeta>,
    /// Field values
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Node {
    /// Empty node owned by `soul`
    pub fn new(soul: impl Into<Soul>) -> Self {
        Self {
            meta: Some(NodeMeta {
                soul: Some(soul.into()),
                states: Some(BTreeMap::new()),
            }),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field write, used for constructing payloads
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>, state: impl Into<State>) -> Self {
        self.set(field.into(), state.into(), value.into());
        self
    }

    /// Soul recorded in the metadata block
    pub fn soul(&self) -> Option<&Soul> {
        self.meta.as_ref().and_then(|meta| meta.soul.as_ref())
    }

    /// State map recorded in the metadata block
    pub fn states(&self) -> Option<&BTreeMap<String, State>> {
        self.meta.as_ref().and_then(|meta| meta.states.as_ref())
    }

    /// State a field was written at, [`State::NEVER`] when absent
    pub fn state_of(&self, field: &str) -> State {
        self.states()
            .and_then(|states| states.get(field))
            .copied()
            .unwrap_or(State::NEVER)
    }

    /// Value of a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the node has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Raw field write: records `value` at `state` without any comparison.
    ///
    /// Conflict resolution happens before this is called.
    pub fn set(&mut self, field: String, state: State, value: Value) {
        let meta = self.meta.get_or_insert_with(NodeMeta::default);
        meta.states
            .get_or_insert_with(BTreeMap::new)
            .insert(field.clone(), state);
        self.fields.insert(field, value);
    }

    /// Ensure the metadata names `soul`
    pub fn claim(&mut self, soul: &Soul) {
        let meta = self.meta.get_or_insert_with(NodeMeta::default);
        meta.soul = Some(soul.clone());
        meta.states.get_or_insert_with(BTreeMap::new);
    }

    /// Copy of a single field as its own node
    pub fn project(&self, field: &str) -> Option<Node> {
        let soul = self.soul()?.clone();
        let value = self.get(field)?.clone();
        Some(Node::new(soul).with(field, value, self.state_of(field)))
    }
}
