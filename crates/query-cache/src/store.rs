//! Insertion-ordered entry store with capacity eviction

use crate::entry::{Entry, Waiter};
use crate::key::CacheKey;
use ahash::RandomState;
use lru::LruCache;
use std::time::{Duration, Instant};

/// Entries keyed by [`CacheKey`], kept in insertion order.
///
/// The backing `LruCache` is unbounded and only ever accessed through `peek`,
/// `pop` and `push`, none of which promote an entry, so its recency order is
/// exactly insertion order. Capacity is enforced by [`Store::evict`].
pub struct Store<T, E> {
    entries: LruCache<CacheKey, Entry<T, E>, RandomState>,
    max_entries: usize,
    last_finished: Option<CacheKey>,
}

impl<T, E> Store<T, E> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: LruCache::unbounded_with_hasher(RandomState::new()),
            max_entries,
            last_finished: None,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&Entry<T, E>> {
        self.entries.peek(key)
    }

    pub fn get_mut(&mut self, key: &CacheKey) -> Option<&mut Entry<T, E>> {
        self.entries.peek_mut(key)
    }

    /// Insert a pending entry at the newest end and enforce capacity.
    ///
    /// Any entry already stored under `key` is replaced. Returns the number
    /// of entries evicted.
    pub fn insert_pending(&mut self, key: CacheKey, now: Instant) -> usize {
        self.entries.pop(&key);
        self.entries.push(key, Entry::pending(now));
        self.evict()
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<Entry<T, E>> {
        self.entries.pop(key)
    }

    /// Record the outcome of a pending entry and return its waiters.
    ///
    /// Returns `None` if no entry is stored under `key`.
    pub(crate) fn finish(
        &mut self,
        key: &CacheKey,
        outcome: Result<T, E>,
    ) -> Option<Vec<Waiter<T, E>>> {
        let entry = self.entries.peek_mut(key)?;
        let waiters = entry.finish(outcome);
        self.last_finished = Some(key.clone());
        Some(waiters)
    }

    /// Remove finished entries, newest first, until the store is within
    /// capacity. Pending entries are never removed, so the store may stay
    /// over capacity if too few entries have finished.
    pub fn evict(&mut self) -> usize {
        if self.entries.len() <= self.max_entries {
            return 0;
        }

        let excess = self.entries.len() - self.max_entries;
        // iter() walks from the most recently inserted entry backward
        let victims: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_finished())
            .map(|(key, _)| key.clone())
            .take(excess)
            .collect();

        for key in &victims {
            self.entries.pop(key);
        }
        victims.len()
    }

    /// Remove every finished entry that has outlived `ttl`
    pub fn remove_expired(&mut self, now: Instant, ttl: Duration) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }

    /// Remove every finished entry
    pub fn clear_finished(&mut self) -> usize {
        let finished: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_finished())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &finished {
            self.entries.pop(key);
        }
        finished.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_pending())
            .count()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Key of the most recently finished entry
    pub fn last_finished(&self) -> Option<&CacheKey> {
        self.last_finished.as_ref()
    }

    /// Keys from oldest to newest insertion
    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: usize) -> CacheKey {
        CacheKey::from_sql(format!("SELECT * FROM t{}", n))
    }

    fn finished_store(max_entries: usize, count: usize) -> Store<usize, String> {
        let mut store = Store::new(usize::MAX);
        let now = Instant::now();
        for i in 0..count {
            store.insert_pending(key(i), now);
            store.finish(&key(i), Ok(i)).unwrap();
        }
        store.max_entries = max_entries;
        store
    }

    #[test]
    fn test_insertion_order() {
        let mut store: Store<usize, String> = Store::new(10);
        let now = Instant::now();
        for i in 0..3 {
            store.insert_pending(key(i), now);
        }
        assert_eq!(store.keys(), vec![key(0), key(1), key(2)]);
    }

    #[test]
    fn test_evicts_newest_finished_first() {
        let mut store = finished_store(2, 3);

        let evicted = store.insert_pending(key(3), Instant::now());

        assert_eq!(evicted, 2);
        assert_eq!(store.keys(), vec![key(0), key(3)]);
    }

    #[test]
    fn test_pending_entries_never_evicted() {
        let mut store: Store<usize, String> = Store::new(1);
        let now = Instant::now();

        assert_eq!(store.insert_pending(key(0), now), 0);
        assert_eq!(store.insert_pending(key(1), now), 0);
        assert_eq!(store.insert_pending(key(2), now), 0);

        assert_eq!(store.len(), 3);
        assert_eq!(store.pending_count(), 3);
    }

    #[test]
    fn test_eviction_skips_pending_entries() {
        let mut store: Store<usize, String> = Store::new(1);
        let now = Instant::now();
        store.insert_pending(key(0), now);
        store.insert_pending(key(1), now);
        store.finish(&key(0), Ok(0)).unwrap();

        // t1 (pending) and t2 (new, pending) survive, t0 goes
        assert_eq!(store.insert_pending(key(2), now), 1);
        assert_eq!(store.keys(), vec![key(1), key(2)]);
    }

    #[test]
    fn test_finish_tracks_last_finished() {
        let mut store: Store<usize, String> = Store::new(10);
        let now = Instant::now();
        store.insert_pending(key(0), now);
        store.insert_pending(key(1), now);
        assert!(store.last_finished().is_none());

        store.finish(&key(1), Ok(1)).unwrap();
        assert_eq!(store.last_finished(), Some(&key(1)));
        assert!(store.finish(&key(9), Ok(9)).is_none());
    }

    #[test]
    fn test_remove_expired() {
        let mut store: Store<usize, String> = Store::new(10);
        let created = Instant::now();
        store.insert_pending(key(0), created);
        store.insert_pending(key(1), created);
        store.finish(&key(0), Ok(0)).unwrap();

        let later = created + Duration::from_secs(5);
        assert_eq!(store.remove_expired(later, Duration::from_secs(1)), 1);
        assert_eq!(store.keys(), vec![key(1)]);
    }

    #[test]
    fn test_clear_finished_keeps_pending() {
        let mut store = finished_store(10, 3);
        store.insert_pending(key(3), Instant::now());

        assert_eq!(store.clear_finished(), 3);
        assert_eq!(store.keys(), vec![key(3)]);
    }
}
