//! Wall-clock state provider.

use parking_lot::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use strand_core::{State, StateEffects};

/// Size of one sub-millisecond step used to keep local states distinct
const STEP: f64 = 0.001;

/// Real time state provider for production use.
///
/// States are Unix milliseconds plus a configurable drift. Two calls within
/// the same millisecond are separated by fractional steps, so every state this
/// clock issues is strictly greater than the previous one.
#[derive(Debug, Default)]
pub struct SystemClock {
    drift_ms: f64,
    inner: Mutex<ClockState>,
}

#[derive(Debug, Default)]
struct ClockState {
    last_ms: f64,
    steps: u32,
}

impl SystemClock {
    /// Clock with no drift
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock shifted by `drift_ms` (e.g. to correct for known peer skew)
    pub fn with_drift(drift_ms: f64) -> Self {
        Self {
            drift_ms,
            inner: Mutex::new(ClockState::default()),
        }
    }

    fn wall_ms() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as f64
    }

    /// Next state for a given wall-clock reading
    fn advance(&self, wall_ms: f64) -> State {
        let mut inner = self.inner.lock();
        let ms = wall_ms + self.drift_ms;
        if ms > inner.last_ms {
            inner.last_ms = ms;
            inner.steps = 0;
            return State::new(ms);
        }
        inner.steps += 1;
        State::new(inner.last_ms + f64::from(inner.steps) * STEP)
    }
}

impl StateEffects for SystemClock {
    fn now(&self) -> State {
        self.advance(Self::wall_ms())
    }
}
