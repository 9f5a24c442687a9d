//! Builders for the graphs and messages tests keep constructing.

use strand_core::{Graph, Node, Soul, State, Value};

/// One `(soul, field, value, state)` tuple
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    /// Node written to
    pub soul: Soul,
    /// Field written
    pub field: String,
    /// New value
    pub value: Value,
    /// State of the write
    pub state: State,
}

impl FieldWrite {
    /// Build a write
    pub fn new(soul: &str, field: &str, value: impl Into<Value>, state: f64) -> Self {
        Self {
            soul: Soul::new(soul),
            field: field.to_string(),
            value: value.into(),
            state: State::new(state),
        }
    }

    /// Single-node graph carrying this write
    pub fn graph(&self) -> Graph {
        Graph::from(self.node())
    }

    /// Single-field node carrying this write
    pub fn node(&self) -> Node {
        Node::new(self.soul.clone()).with(self.field.clone(), self.value.clone(), self.state)
    }
}

/// Node with the given `(field, value, state)` entries
pub fn node(soul: &str, fields: &[(&str, Value, f64)]) -> Node {
    fields
        .iter()
        .fold(Node::new(soul), |node, (field, value, state)| {
            node.with(*field, value.clone(), *state)
        })
}

/// Graph holding the given nodes
pub fn graph_of(nodes: impl IntoIterator<Item = Node>) -> Graph {
    nodes
        .into_iter()
        .map(|node| {
            let soul = node.soul().cloned().unwrap_or_else(|| Soul::new(""));
            (soul, node)
        })
        .collect()
}

/// Graph containing every write, merged per soul
pub fn graph_from_writes(writes: &[FieldWrite]) -> Graph {
    let mut graph = Graph::new();
    for write in writes {
        if !graph.contains(&write.soul) {
            graph.insert(write.soul.clone(), Node::new(write.soul.clone()));
        }
        if let Some(node) = graph.get_mut(&write.soul) {
            node.set(write.field.clone(), write.state, write.value.clone());
        }
    }
    graph
}

/// Node whose metadata lacks the state map, which committers must reject
pub fn node_without_states(soul: &str, field: &str, value: impl Into<Value>) -> Node {
    let mut node = Node::new(soul);
    node.fields.insert(field.to_string(), value.into());
    if let Some(meta) = node.meta.as_mut() {
        meta.states = None;
    }
    node
}
