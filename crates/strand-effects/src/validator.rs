//! Default value validator.

use strand_core::{Value, ValueValidator};

/// Accepts null, booleans, text, finite numbers and relations to a non-empty
/// soul.
///
/// Structural checks (arrays, arbitrary objects) already happen when a message
/// is decoded; this catches values that decode fine but cannot be stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl ValueValidator for DefaultValidator {
    fn is_valid(&self, value: &Value) -> bool {
        match value {
            Value::Null | Value::Bool(_) | Value::Text(_) => true,
            Value::Number(number) => number.is_finite(),
            Value::Relation(rel) => !rel.soul.is_empty(),
        }
    }
}
