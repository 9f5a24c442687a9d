//! Value-type validation.

use crate::types::Value;

/// Accepts or rejects a candidate field value.
///
/// A rejected value aborts the rest of the enclosing put batch.
pub trait ValueValidator: Send + Sync {
    /// True when `value` may be stored
    fn is_valid(&self, value: &Value) -> bool;
}
