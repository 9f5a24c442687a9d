//! Logical timestamps used for per-field conflict resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic logical timestamp attached to every field write.
///
/// Values are milliseconds since the Unix epoch plus clock drift, with
/// fractional steps used to keep successive local writes distinct. A state may
/// run ahead of the local wall clock (clock skew, scheduled writes); the HAM
/// rule defers such writes instead of rejecting them.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(f64);

impl State {
    /// State of a field that was never written. Loses against every real state.
    pub const NEVER: State = State(f64::NEG_INFINITY);

    /// Wrap a raw timestamp
    pub const fn new(ms: f64) -> Self {
        Self(ms)
    }

    /// Raw timestamp in milliseconds
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// True for states that can be stored or sent on the wire
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Milliseconds from `self` until `later`, zero if `later` is not ahead
    pub fn millis_until(self, later: State) -> f64 {
        let delta = later.0 - self.0;
        if delta.is_nan() || delta < 0.0 {
            0.0
        } else {
            delta
        }
    }

    /// This state shifted forward by `ms`
    pub fn plus_millis(self, ms: f64) -> State {
        State(self.0 + ms)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::NEVER
    }
}

impl From<f64> for State {
    fn from(ms: f64) -> Self {
        Self(ms)
    }
}

impl From<u64> for State {
    fn from(ms: u64) -> Self {
        Self(ms as f64)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
