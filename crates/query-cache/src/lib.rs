//! Coalescing Query Result Cache
//!
//! This crate sits in front of an asynchronous query executor and keeps it
//! from doing redundant work.
//!
//! # Features
//!
//! - **Coalescing**: identical concurrent queries run once; every caller gets the same outcome
//! - **TTL Support**: finished results are served until they are older than the configured timeout
//! - **Capacity Limits**: finished entries are evicted once the entry count exceeds `max`
//! - **Error Replay**: executor errors are cached and replayed exactly like results
//! - **Thread-Safe**: lookups and inserts happen in a single `parking_lot` critical section
//! - **Statistics**: track hits, misses, coalesced requests, evictions and expirations
//!
//! # Example
//!
//! ```ignore
//! use query_cache::{CacheConfig, QueryCache};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let cache = QueryCache::new(CacheConfig::default()).with_connection(Arc::clone(&conn));
//!
//! let outcome = cache.query_default("SELECT * FROM users WHERE id = ?", json!([42])).await?;
//! if outcome.was_cached {
//!     println!("served without touching the database");
//! }
//! let rows = outcome.result?;
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod entry;
pub mod error;
pub mod invalidation;
pub mod key;
pub mod stats;
pub mod store;

pub use cache::{QueryCache, QueryOutcome};
pub use config::CacheConfig;
pub use connection::Connection;
pub use entry::{Entry, EntryState, Waiter};
pub use error::{CacheError, Result};
pub use key::{empty_params, CacheKey};
pub use stats::CacheStats;
