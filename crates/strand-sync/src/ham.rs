//! HAM: the per-field conflict resolution rule.
//!
//! Last writer wins by state; concurrent writes at the same state are broken
//! by comparing canonical serializations, so every replica picks the same
//! winner without coordination. Writes from the future are not rejected but
//! re-evaluated once local time catches up.

use strand_core::{State, Value};

/// Outcome of comparing one candidate write against the stored field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HamDecision {
    /// Apply the write
    Accept,
    /// Candidate is older than what is stored; discard
    Stale,
    /// Same state and the candidate does not win the tie-break; discard
    Tie,
    /// Candidate lies in the future; re-evaluate after `delay_ms`
    Defer {
        /// Milliseconds to wait, already capped
        delay_ms: u64,
    },
}

impl HamDecision {
    /// True when the write should be committed now
    pub fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Everything the rule looks at for one field
#[derive(Debug, Clone, Copy)]
pub struct HamInput<'a> {
    /// Current local time
    pub now: State,
    /// State of the candidate write
    pub state: State,
    /// State the field was last written at ([`State::NEVER`] if never)
    pub was: State,
    /// Candidate value
    pub value: &'a Value,
    /// Stored value, if any
    pub known: Option<&'a Value>,
    /// Trusted replay: skip the equal-state comparison
    pub faith: bool,
    /// Forced re-apply: accept stale and tied writes
    pub miss: bool,
    /// Upper bound on a deferral
    pub max_defer_ms: u64,
}

/// Decide what to do with one candidate field write
pub fn decide(input: &HamInput<'_>) -> HamDecision {
    if input.state > input.now {
        let wait = input.now.millis_until(input.state).ceil();
        let delay_ms = if wait >= input.max_defer_ms as f64 {
            input.max_defer_ms
        } else {
            (wait as u64).max(1)
        };
        return HamDecision::Defer { delay_ms };
    }
    if input.state < input.was && !input.miss {
        return HamDecision::Stale;
    }
    if !input.faith && !input.miss && input.state == input.was && loses_tie(input.value, input.known) {
        return HamDecision::Tie;
    }
    HamDecision::Accept
}

/// Equal-state tie-break: the candidate loses unless its canonical form sorts
/// strictly after the stored one.
///
/// Only the canonical form is compared: `-0.0 == 0.0` as numbers but not as
/// serializations, and every replica must agree on the winner.
fn loses_tie(value: &Value, known: Option<&Value>) -> bool {
    known.is_some_and(|known| value.lexical() <= known.lexical())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(state: f64, was: f64, value: &'a Value, known: Option<&'a Value>) -> HamInput<'a> {
        HamInput {
            now: State::new(100.0),
            state: State::new(state),
            was: State::new(was),
            value,
            known,
            faith: false,
            miss: false,
            max_defer_ms: 1_000,
        }
    }

    #[test]
    fn test_newer_state_wins() {
        let (a, b) = (Value::from("a"), Value::from("b"));
        assert_eq!(decide(&input(10.0, 5.0, &a, Some(&b))), HamDecision::Accept);
    }

    #[test]
    fn test_never_written_field_accepts() {
        let a = Value::from("a");
        let mut write = input(0.0, 0.0, &a, None);
        write.was = State::NEVER;
        assert!(decide(&write).is_accept());
    }

    #[test]
    fn test_older_state_is_stale() {
        let (a, b) = (Value::from("a"), Value::from("b"));
        assert_eq!(decide(&input(4.0, 5.0, &a, Some(&b))), HamDecision::Stale);
    }

    #[test]
    fn test_miss_forces_stale_and_tied_writes() {
        let (a, b) = (Value::from("a"), Value::from("b"));
        let mut stale = input(4.0, 5.0, &a, Some(&b));
        stale.miss = true;
        assert!(decide(&stale).is_accept());

        let mut tie = input(5.0, 5.0, &a, Some(&a));
        tie.miss = true;
        assert!(decide(&tie).is_accept());
    }

    #[test]
    fn test_tie_break_is_lexical() {
        let (alice, alicia) = (Value::from("Alice"), Value::from("Alicia"));
        assert!(decide(&input(5.0, 5.0, &alicia, Some(&alice))).is_accept());
        assert_eq!(decide(&input(5.0, 5.0, &alice, Some(&alicia))), HamDecision::Tie);
        assert_eq!(decide(&input(5.0, 5.0, &alice, Some(&alice))), HamDecision::Tie);
    }

    #[test]
    fn test_signed_zero_tie_is_decided_by_serialization() {
        let (zero, negative) = (Value::Number(0.0), Value::Number(-0.0));
        assert_eq!(zero, negative);
        assert!(decide(&input(5.0, 5.0, &zero, Some(&negative))).is_accept());
        assert_eq!(decide(&input(5.0, 5.0, &negative, Some(&zero))), HamDecision::Tie);
    }

    #[test]
    fn test_faith_skips_tie_check_but_not_staleness() {
        let (alice, alicia) = (Value::from("Alice"), Value::from("Alicia"));
        let mut tie = input(5.0, 5.0, &alice, Some(&alicia));
        tie.faith = true;
        assert!(decide(&tie).is_accept());

        let mut stale = input(4.0, 5.0, &alice, Some(&alicia));
        stale.faith = true;
        assert_eq!(decide(&stale), HamDecision::Stale);
    }

    #[test]
    fn test_future_state_defers_with_cap() {
        let a = Value::from("a");
        assert_eq!(
            decide(&input(150.0, 0.0, &a, None)),
            HamDecision::Defer { delay_ms: 50 }
        );
        assert_eq!(
            decide(&input(100.25, 0.0, &a, None)),
            HamDecision::Defer { delay_ms: 1 }
        );
        assert_eq!(
            decide(&input(1e15, 0.0, &a, None)),
            HamDecision::Defer { delay_ms: 1_000 }
        );
    }
}
