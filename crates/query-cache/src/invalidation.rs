//! Time-based invalidation of finished entries
//!
//! Staleness is checked lazily when an entry is looked up. Nothing sweeps the
//! store in the background; stale entries keep their slot until a lookup
//! replaces them, eviction removes them, or a caller runs
//! [`QueryCache::expire_stale`](crate::QueryCache::expire_stale).

use std::time::{Duration, Instant};

/// Whether an entry created at `created_at` is no longer valid at `now`.
///
/// An entry exactly `ttl` old is still valid.
pub fn is_invalid(created_at: Instant, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(created_at) > ttl
}
