//! Graph data model: souls, states, values and nodes.

pub mod node;
pub mod soul;
pub mod state;
pub mod value;

pub use node::{Node, NodeMeta};
pub use soul::Soul;
pub use state::State;
pub use value::{Relation, Value};
