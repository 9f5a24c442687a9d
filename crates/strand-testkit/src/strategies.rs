//! Property test strategies for strand types
//!
//! Ranges are small so that generated writes collide on
//! souls, fields and states, which is where the merge rule is interesting.

use crate::fixtures::FieldWrite;
use proptest::prelude::*;
use strand_core::{Soul, State, Value};

// Re-export proptest for convenience
pub use proptest;

/// Soul drawn from a handful of names
pub fn arb_soul() -> impl Strategy<Value = Soul> {
    prop_oneof![Just("a"), Just("b"), Just("c")].prop_map(Soul::new)
}

/// Field name drawn from a handful of names
pub fn arb_field() -> impl Strategy<Value = String> {
    prop_oneof![Just("x"), Just("y"), Just("z")].prop_map(str::to_string)
}

/// Any storable value
pub fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-100i64..100).prop_map(Value::from),
        (-400i64..400).prop_map(|quarters| Value::Number(quarters as f64 / 4.0)),
        prop_oneof![Just(0.0), Just(-0.0)].prop_map(Value::Number),
        "[a-z]{0,4}".prop_map(Value::Text),
        arb_soul().prop_map(|soul| Value::relation(soul)),
    ]
}

/// Whole-millisecond state in a narrow window
pub fn arb_state() -> impl Strategy<Value = State> {
    (1u32..20).prop_map(|ms| State::new(f64::from(ms)))
}

/// One field write
pub fn arb_write() -> impl Strategy<Value = FieldWrite> {
    (arb_soul(), arb_field(), arb_value(), arb_state()).prop_map(|(soul, field, value, state)| {
        FieldWrite {
            soul,
            field,
            value,
            state,
        }
    })
}

/// Sequence of field writes
pub fn arb_writes(max: usize) -> impl Strategy<Value = Vec<FieldWrite>> {
    prop::collection::vec(arb_write(), 1..=max)
}
