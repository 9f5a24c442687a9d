//! Bounded message-id cache.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use strand_core::{DedupTracker, MessageId};

/// Remembers recently seen message ids.
///
/// Entries are kept in insertion order; the oldest are evicted once the cache
/// exceeds `max_entries` or an entry outlives `max_age`. A hit refreshes the
/// entry so ids that keep circulating stay suppressed.
#[derive(Debug)]
pub struct DedupCache {
    max_entries: usize,
    max_age: Duration,
    seen: Mutex<IndexMap<MessageId, Instant>>,
}

impl DedupCache {
    /// Cache holding at most `max_entries` ids for `max_age_ms` each
    pub fn new(max_entries: usize, max_age_ms: u64) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_age: Duration::from_millis(max_age_ms),
            seen: Mutex::new(IndexMap::new()),
        }
    }

    /// Number of ids currently remembered
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// True when no id is remembered
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    fn check_at(&self, id: &MessageId, now: Instant) -> bool {
        let mut seen = self.seen.lock();
        self.expire(&mut seen, now);
        if seen.shift_remove(id).is_some() {
            seen.insert(id.clone(), now);
            return true;
        }
        false
    }

    fn track_at(&self, id: &MessageId, now: Instant) {
        let mut seen = self.seen.lock();
        seen.shift_remove(id);
        seen.insert(id.clone(), now);
        self.expire(&mut seen, now);
    }

    fn expire(&self, seen: &mut IndexMap<MessageId, Instant>, now: Instant) {
        while let Some((_, at)) = seen.first() {
            let too_old = now.saturating_duration_since(*at) > self.max_age;
            if !too_old && seen.len() <= self.max_entries {
                break;
            }
            seen.shift_remove_index(0);
        }
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(999, 9_000)
    }
}

impl DedupTracker for DedupCache {
    fn check(&self, id: &MessageId) -> bool {
        self.check_at(id, Instant::now())
    }

    fn track(&self, id: &MessageId) {
        self.track_at(id, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seen_after_track() {
        let cache = DedupCache::default();
        let id = MessageId::new("a");
        assert!(!cache.check(&id));
        cache.track(&id);
        assert!(cache.check(&id));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = DedupCache::new(2, 60_000);
        let start = Instant::now();
        for name in ["a", "b", "c"] {
            cache.track_at(&MessageId::new(name), start);
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.check_at(&MessageId::new("a"), start));
        assert!(cache.check_at(&MessageId::new("c"), start));
    }

    #[test]
    fn test_entries_expire() {
        let cache = DedupCache::new(10, 100);
        let start = Instant::now();
        cache.track_at(&MessageId::new("a"), start);
        assert!(cache.check_at(&MessageId::new("a"), start + Duration::from_millis(50)));
        assert!(!cache.check_at(&MessageId::new("a"), start + Duration::from_millis(500)));
        assert!(cache.is_empty());
    }
}
