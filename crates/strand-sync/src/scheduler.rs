//! Deterministic task queue backing every suspension point of the engine.
//!
//! Work that must not run inside the current call (the rest of a sliced batch,
//! a deferred HAM retry, barrier waiters, the next reply slice) becomes a
//! [`Task`]. Ready tasks run on the next tick; timed tasks become ready once
//! the engine's clock reaches their deadline.

use crate::fire::Waiter;
use crate::get::ReplyCursor;
use crate::put::{FieldWrite, PutCursor};
use std::collections::{BTreeMap, VecDeque};
use strand_core::{ContextId, State};

/// Deferred unit of engine work
#[derive(Debug)]
pub(crate) enum Task {
    /// Continue walking a put batch
    ResumePut { ctx: ContextId, cursor: PutCursor },
    /// Re-run HAM for a future-state write
    Ham { ctx: ContextId, write: FieldWrite },
    /// Run callbacks released by a fired barrier
    Waiters(Vec<Waiter>),
    /// Emit the next slice of a read reply
    ResumeReply(ReplyCursor),
}

/// Ready queue plus timers ordered by `(deadline, insertion)`
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    ready: VecDeque<Task>,
    timers: BTreeMap<(i64, u64), Task>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` on the next tick
    pub fn schedule(&mut self, task: Task) {
        self.ready.push_back(task);
    }

    /// Run `task` on the first tick at or after `deadline`
    pub fn schedule_at(&mut self, deadline: State, task: Task) {
        let key = (deadline_key(deadline), self.seq);
        self.seq += 1;
        self.timers.insert(key, task);
    }

    /// Move every timer due at `now` to the ready queue, earliest first
    pub fn promote(&mut self, now: State) {
        while let Some(entry) = self.timers.first_entry() {
            if entry.key().0 as f64 > now.as_f64() {
                break;
            }
            let task = entry.remove();
            self.ready.push_back(task);
        }
    }

    /// Take the tasks that are ready now; tasks they schedule wait for the
    /// next tick
    pub fn take_ready(&mut self) -> VecDeque<Task> {
        std::mem::take(&mut self.ready)
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Earliest timer deadline
    pub fn next_deadline(&self) -> Option<State> {
        self.timers
            .keys()
            .next()
            .map(|(deadline, _)| State::new(*deadline as f64))
    }

    /// Ready tasks plus timers
    pub fn len(&self) -> usize {
        self.ready.len() + self.timers.len()
    }
}

/// Whole-millisecond timer key, rounded up so a timer never fires early
fn deadline_key(deadline: State) -> i64 {
    let ms = deadline.as_f64().ceil();
    if ms.is_nan() {
        0
    } else {
        ms.clamp(i64::MIN as f64, i64::MAX as f64) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiters() -> Task {
        Task::Waiters(Vec::new())
    }

    #[test]
    fn test_timers_promote_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(State::new(20.0), waiters());
        scheduler.schedule_at(State::new(10.5), waiters());
        assert_eq!(scheduler.next_deadline(), Some(State::new(11.0)));

        scheduler.promote(State::new(10.9));
        assert!(!scheduler.has_ready());

        scheduler.promote(State::new(11.0));
        assert_eq!(scheduler.take_ready().len(), 1);
        assert_eq!(scheduler.next_deadline(), Some(State::new(20.0)));

        scheduler.promote(State::new(100.0));
        assert_eq!(scheduler.take_ready().len(), 1);
        assert_eq!(scheduler.len(), 0);
    }

    #[test]
    fn test_take_ready_drains_queue() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(waiters());
        scheduler.schedule(waiters());
        assert_eq!(scheduler.take_ready().len(), 2);
        assert!(!scheduler.has_ready());
    }
}
