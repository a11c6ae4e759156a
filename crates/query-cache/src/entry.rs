//! Cache entries and their pending/finished lifecycle

use crate::invalidation::is_invalid;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Channel a waiter receives the finished outcome on
pub type Waiter<T, E> = oneshot::Sender<Result<T, E>>;

/// State of a cache entry
#[derive(Debug)]
pub enum EntryState<T, E> {
    /// The query has been dispatched and has not completed yet
    Pending { waiters: Vec<Waiter<T, E>> },
    /// The query completed with a result or an error
    Finished(Result<T, E>),
}

/// Entry stored in the cache
#[derive(Debug)]
pub struct Entry<T, E> {
    state: EntryState<T, E>,
    created_at: Instant,
}

impl<T, E> Entry<T, E> {
    /// Create a pending entry
    pub fn pending(created_at: Instant) -> Self {
        Self {
            state: EntryState::Pending {
                waiters: Vec::new(),
            },
            created_at,
        }
    }

    /// When this entry was inserted
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get the age of this entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn state(&self) -> &EntryState<T, E> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, EntryState::Pending { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, EntryState::Finished(_))
    }

    /// The recorded outcome, once finished
    pub fn outcome(&self) -> Option<&Result<T, E>> {
        match &self.state {
            EntryState::Finished(outcome) => Some(outcome),
            EntryState::Pending { .. } => None,
        }
    }

    /// Number of callers waiting on a pending entry
    pub fn waiter_count(&self) -> usize {
        match &self.state {
            EntryState::Pending { waiters } => waiters.len(),
            EntryState::Finished(_) => 0,
        }
    }

    /// Whether a finished entry has outlived `ttl`. Pending entries never expire.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.is_finished() && is_invalid(self.created_at, now, ttl)
    }

    /// Register interest in a pending entry's outcome.
    ///
    /// Returns `None` if the entry has already finished.
    pub(crate) fn subscribe(&mut self) -> Option<oneshot::Receiver<Result<T, E>>> {
        match &mut self.state {
            EntryState::Pending { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Some(rx)
            }
            EntryState::Finished(_) => None,
        }
    }

    /// Record the outcome and hand back the waiters to notify.
    ///
    /// An entry finishes once; a second call leaves the first outcome in
    /// place and returns no waiters.
    pub(crate) fn finish(&mut self, outcome: Result<T, E>) -> Vec<Waiter<T, E>> {
        match &mut self.state {
            EntryState::Pending { waiters } => {
                let waiters = std::mem::take(waiters);
                self.state = EntryState::Finished(outcome);
                waiters
            }
            EntryState::Finished(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_entry() {
        let entry: Entry<i32, String> = Entry::pending(Instant::now());
        assert!(entry.is_pending());
        assert!(!entry.is_finished());
        assert!(entry.outcome().is_none());
        assert_eq!(entry.waiter_count(), 0);
    }

    #[test]
    fn test_pending_entry_never_expires() {
        let created = Instant::now();
        let entry: Entry<i32, String> = Entry::pending(created);
        assert!(!entry.is_expired(created + Duration::from_secs(60), Duration::ZERO));
    }

    #[test]
    fn test_finish_notifies_waiters() {
        let mut entry: Entry<i32, String> = Entry::pending(Instant::now());
        let mut rx1 = entry.subscribe().unwrap();
        let mut rx2 = entry.subscribe().unwrap();
        assert_eq!(entry.waiter_count(), 2);

        let waiters = entry.finish(Ok(7));
        assert_eq!(waiters.len(), 2);
        for tx in waiters {
            tx.send(Ok(7)).unwrap();
        }

        assert_eq!(rx1.try_recv().unwrap(), Ok(7));
        assert_eq!(rx2.try_recv().unwrap(), Ok(7));
        assert_eq!(entry.outcome(), Some(&Ok(7)));
    }

    #[test]
    fn test_finished_entry_rejects_subscribers() {
        let mut entry: Entry<i32, String> = Entry::pending(Instant::now());
        entry.finish(Err("boom".to_string()));
        assert!(entry.subscribe().is_none());
        assert_eq!(entry.outcome(), Some(&Err("boom".to_string())));
    }

    #[test]
    fn test_finish_is_write_once() {
        let mut entry: Entry<i32, String> = Entry::pending(Instant::now());
        entry.finish(Ok(1));
        assert!(entry.finish(Ok(2)).is_empty());
        assert_eq!(entry.outcome(), Some(&Ok(1)));
    }

    #[test]
    fn test_finished_entry_expires() {
        let created = Instant::now();
        let mut entry: Entry<i32, String> = Entry::pending(created);
        entry.finish(Ok(1));
        let ttl = Duration::from_millis(50);
        assert!(!entry.is_expired(created + ttl, ttl));
        assert!(entry.is_expired(created + ttl * 2, ttl));
    }
}
