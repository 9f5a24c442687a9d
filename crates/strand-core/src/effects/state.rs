//! Logical clock and the per-field CRDT write primitive.

use crate::types::{Node, Soul, State, Value};

/// State provider: issues timestamps and merges single fields into nodes.
///
/// Only [`StateEffects::now`] must be implemented; the field primitives have
/// the canonical behaviour as defaults so every handler stores nodes the same
/// way.
pub trait StateEffects: Send + Sync {
    /// Current logical time. Successive calls never return a smaller state.
    fn now(&self) -> State;

    /// State `field` was last written at, [`State::NEVER`] when unknown
    fn state_of(&self, node: Option<&Node>, field: &str) -> State {
        node.map_or(State::NEVER, |node| node.state_of(field))
    }

    /// Write `value` at `state` into `node`, creating the node when absent.
    ///
    /// No comparison happens here; callers decide with the HAM rule first.
    fn merge_field(&self, node: Option<Node>, field: &str, state: State, value: Value, soul: &Soul) -> Node {
        let mut node = node.unwrap_or_else(|| Node::new(soul.clone()));
        node.claim(soul);
        node.set(field.to_string(), state, value);
        node
    }
}
