//! Coalescing query cache implementation

use crate::config::CacheConfig;
use crate::connection::Connection;
use crate::error::{CacheError, Result};
use crate::key::{empty_params, CacheKey};
use crate::stats::CacheStats;
use crate::store::Store;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Outcome of a cached query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome<T, E> {
    /// The executor's result or error
    pub result: std::result::Result<T, E>,
    /// False only for the request that dispatched the query
    pub was_cached: bool,
}

impl<T, E> QueryOutcome<T, E> {
    fn fresh(result: std::result::Result<T, E>) -> Self {
        Self {
            result,
            was_cached: false,
        }
    }

    fn cached(result: std::result::Result<T, E>) -> Self {
        Self {
            result,
            was_cached: true,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> std::result::Result<T, E> {
        self.result
    }
}

/// What a lookup decided for one request
enum Lookup<T, E> {
    /// Finished and still valid
    Hit(std::result::Result<T, E>),
    /// Already in flight; wait for its outcome
    Wait(oneshot::Receiver<std::result::Result<T, E>>),
    /// Inserted a pending entry; the caller must dispatch
    Dispatch,
}

/// Takes a pending entry back out of the store when its dispatch is torn
/// down before recording an outcome (the executor panicked, there was no
/// runtime to spawn on, or the runtime shut down). Removing the entry drops
/// its waiters' senders, so they fail with `DispatchFailed`, and the next
/// request for the key dispatches again.
struct PendingGuard<T, E> {
    store: Arc<Mutex<Store<T, E>>>,
    stats: Arc<CacheStats>,
    key: Option<CacheKey>,
}

impl<T, E> PendingGuard<T, E> {
    fn new(store: &Arc<Mutex<Store<T, E>>>, stats: &Arc<CacheStats>, key: CacheKey) -> Self {
        Self {
            store: Arc::clone(store),
            stats: Arc::clone(stats),
            key: Some(key),
        }
    }

    fn disarm(&mut self) {
        self.key = None;
    }
}

impl<T, E> Drop for PendingGuard<T, E> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let mut store = self.store.lock();
        if store.get(&key).map(|e| e.is_pending()).unwrap_or(false) {
            store.remove(&key);
            self.stats.set_entry_count(store.len() as u64);
            warn!("Query dispatch abandoned, releasing key: {}", key);
        }
    }
}

/// Thread-safe cache that deduplicates in-flight queries and serves
/// finished results until they expire.
pub struct QueryCache<T, E> {
    store: Arc<Mutex<Store<T, E>>>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
    connection: Option<Arc<dyn Connection<Output = T, Error = E>>>,
}

impl<T, E> QueryCache<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a new query cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::new(config.max_entries))),
            config,
            stats: Arc::new(CacheStats::new()),
            connection: None,
        }
    }

    /// Create a cache with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Set the connection used when a query names none
    pub fn with_connection<C>(mut self, connection: Arc<C>) -> Self
    where
        C: Connection<Output = T, Error = E> + 'static,
    {
        let connection: Arc<dyn Connection<Output = T, Error = E>> = connection;
        self.connection = Some(connection);
        self
    }

    /// Run `sql` on `conn` through the cache
    pub async fn query<C>(
        &self,
        conn: &Arc<C>,
        sql: &str,
        params: Value,
    ) -> Result<QueryOutcome<T, E>>
    where
        C: Connection<Output = T, Error = E> + ?Sized + 'static,
    {
        let key = CacheKey::new(sql, &params);
        let conn = Arc::clone(conn);
        self.get_or_execute(key, move |key| async move {
            conn.query(key.sql(), &params).await
        })
        .await
    }

    /// Run `sql` on the default connection
    pub async fn query_default(&self, sql: &str, params: Value) -> Result<QueryOutcome<T, E>> {
        let conn = self
            .connection
            .clone()
            .ok_or(CacheError::ConnectionNotConfigured)?;
        self.query(&conn, sql, params).await
    }

    /// Run `sql` without parameters on the default connection
    pub async fn query_sql(&self, sql: &str) -> Result<QueryOutcome<T, E>> {
        self.query_default(sql, empty_params()).await
    }

    /// Serve `key` from the cache, joining an in-flight execution or
    /// dispatching `executor` when there is nothing usable.
    ///
    /// The executor's future is spawned onto the tokio runtime, so it runs
    /// to completion and its outcome reaches every waiter even if this
    /// caller stops polling.
    pub async fn get_or_execute<F, Fut>(
        &self,
        key: CacheKey,
        executor: F,
    ) -> Result<QueryOutcome<T, E>>
    where
        F: FnOnce(CacheKey) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        if !self.config.enabled {
            self.stats.record_miss();
            return Ok(QueryOutcome::fresh(executor(key).await));
        }

        match self.lookup(&key) {
            Lookup::Hit(result) => Ok(QueryOutcome::cached(result)),
            Lookup::Wait(rx) => {
                let result = rx.await.map_err(|_| {
                    CacheError::DispatchFailed(format!("query for '{}' was abandoned", key))
                })?;
                Ok(QueryOutcome::cached(result))
            }
            Lookup::Dispatch => self.dispatch(key, executor).await,
        }
    }

    /// Decide hit, wait or dispatch in one critical section
    fn lookup(&self, key: &CacheKey) -> Lookup<T, E> {
        let now = Instant::now();
        let mut store = self.store.lock();

        if let Some(entry) = store.get_mut(key) {
            if let Some(rx) = entry.subscribe() {
                debug!("Joining in-flight query: {}", key);
                self.stats.record_coalesced();
                return Lookup::Wait(rx);
            }

            if !entry.is_expired(now, self.config.ttl) {
                if let Some(outcome) = entry.outcome() {
                    debug!("Cache hit: {}", key);
                    self.stats.record_hit();
                    return Lookup::Hit(outcome.clone());
                }
            }

            debug!("Cache entry expired: {}", key);
            store.remove(key);
            self.stats.record_expirations(1);
        }

        debug!("Cache miss, dispatching: {}", key);
        let evicted = store.insert_pending(key.clone(), now);
        if evicted > 0 {
            debug!("Evicted {} finished entries", evicted);
            self.stats.record_evictions(evicted as u64);
        }
        self.stats.record_miss();
        self.stats.set_entry_count(store.len() as u64);
        Lookup::Dispatch
    }

    async fn dispatch<F, Fut>(&self, key: CacheKey, executor: F) -> Result<QueryOutcome<T, E>>
    where
        F: FnOnce(CacheKey) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let mut guard = PendingGuard::new(&self.store, &self.stats, key.clone());
        let execution = executor(key.clone());
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);

        let handle = tokio::spawn(async move {
            let result = execution.await;

            let waiters = {
                let mut store = store.lock();
                let waiters = store.finish(&key, result.clone()).unwrap_or_default();
                stats.set_entry_count(store.len() as u64);
                waiters
            };
            guard.disarm();

            debug!("Query finished, notifying {} waiters: {}", waiters.len(), key);
            for waiter in waiters {
                // A waiter that stopped listening is not an error
                let _ = waiter.send(result.clone());
            }
            result
        });

        match handle.await {
            Ok(result) => Ok(QueryOutcome::fresh(result)),
            Err(err) => {
                warn!("Query dispatch failed: {}", err);
                Err(CacheError::DispatchFailed(err.to_string()))
            }
        }
    }

    /// Remove a finished entry. Pending entries are left alone.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut store = self.store.lock();
        let finished = store.get(key).map(|e| e.is_finished()).unwrap_or(false);
        if finished {
            store.remove(key);
            self.stats.set_entry_count(store.len() as u64);
        }
        finished
    }

    /// Remove all finished entries
    pub fn clear(&self) {
        let mut store = self.store.lock();
        let removed = store.clear_finished();
        debug!("Cleared {} finished entries", removed);
        self.stats.set_entry_count(store.len() as u64);
    }

    /// Expire entries that have exceeded TTL
    pub fn expire_stale(&self) -> usize {
        let mut store = self.store.lock();
        let count = store.remove_expired(Instant::now(), self.config.ttl);
        self.stats.record_expirations(count as u64);
        self.stats.set_entry_count(store.len() as u64);
        count
    }
}

impl<T, E> QueryCache<T, E> {
    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Get current number of entries, pending ones included
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Number of queries currently in flight
    pub fn pending_count(&self) -> usize {
        self.store.lock().pending_count()
    }

    /// Whether a usable or in-flight entry exists for `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.store
            .lock()
            .get(key)
            .map(|e| !e.is_expired(Instant::now(), self.config.ttl))
            .unwrap_or(false)
    }

    /// Key of the most recently finished query
    pub fn last_finished(&self) -> Option<CacheKey> {
        self.store.lock().last_finished().cloned()
    }

    /// Whether a default connection is configured
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl<T, E> std::fmt::Debug for QueryCache<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("enabled", &self.config.enabled)
            .field("max_entries", &self.config.max_entries)
            .field("ttl", &self.config.ttl)
            .field("current_entries", &self.len())
            .field("pending", &self.pending_count())
            .field("has_connection", &self.has_connection())
            .finish()
    }
}
