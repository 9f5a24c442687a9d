//! Manually driven state provider.

use parking_lot::Mutex;
use strand_core::{State, StateEffects};

/// Clock that only moves when a test moves it
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Clock frozen at `now_ms`
    pub fn new(now_ms: f64) -> Self {
        Self {
            now: Mutex::new(now_ms),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now_ms: f64) {
        *self.now.lock() = now_ms;
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: f64) {
        *self.now.lock() += ms;
    }

    /// Current reading in milliseconds
    pub fn millis(&self) -> f64 {
        *self.now.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl StateEffects for ManualClock {
    fn now(&self) -> State {
        State::new(self.millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10.0);
        assert_eq!(clock.now(), State::new(10.0));
        clock.advance(5.0);
        assert_eq!(clock.now(), State::new(15.0));
        clock.set(1.0);
        assert_eq!(clock.now(), State::new(1.0));
    }
}
