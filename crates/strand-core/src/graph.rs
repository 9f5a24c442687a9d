//! The soul → node mapping.
//!
//! Used both for the authoritative local replica and for the partial graphs
//! carried by `put` messages.

use crate::types::{Node, Soul};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from soul to node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graph(BTreeMap<Soul, Node>);

impl Graph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Node stored under `soul`
    pub fn get(&self, soul: &Soul) -> Option<&Node> {
        self.0.get(soul)
    }

    /// Mutable node stored under `soul`
    pub fn get_mut(&mut self, soul: &Soul) -> Option<&mut Node> {
        self.0.get_mut(soul)
    }

    /// Insert or replace a node
    pub fn insert(&mut self, soul: Soul, node: Node) -> Option<Node> {
        self.0.insert(soul, node)
    }

    /// Remove a node, handing ownership to the caller
    pub fn take(&mut self, soul: &Soul) -> Option<Node> {
        self.0.remove(soul)
    }

    /// True when `soul` has a node
    pub fn contains(&self, soul: &Soul) -> bool {
        self.0.contains_key(soul)
    }

    /// Souls in sorted order
    pub fn souls(&self) -> impl Iterator<Item = &Soul> {
        self.0.keys()
    }

    /// Soul/node pairs in soul order
    pub fn iter(&self) -> impl Iterator<Item = (&Soul, &Node)> {
        self.0.iter()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of fields across all nodes
    pub fn field_count(&self) -> usize {
        self.0.values().map(Node::len).sum()
    }
}

impl FromIterator<(Soul, Node)> for Graph {
    fn from_iter<I: IntoIterator<Item = (Soul, Node)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Node> for Graph {
    /// Single-node graph keyed by the node's own soul
    fn from(node: Node) -> Self {
        let soul = node.soul().cloned().unwrap_or_else(|| Soul::new(""));
        [(soul, node)].into_iter().collect()
    }
}

impl IntoIterator for Graph {
    type Item = (Soul, Node);
    type IntoIter = std::collections::btree_map::IntoIter<Soul, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_from_node_uses_its_soul() {
        let graph = Graph::from(Node::new("a").with("x", 1.0, 1.0));
        assert!(graph.contains(&Soul::new("a")));
        assert_eq!(graph.field_count(), 1);
    }

    #[test]
    fn test_graph_json_is_a_plain_map() {
        let graph = Graph::from(Node::new("a").with("x", true, 1.0));
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["a"]["x"], true);
    }
}
