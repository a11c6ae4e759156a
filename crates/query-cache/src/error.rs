//! Error types for the query cache

use thiserror::Error;

/// Errors raised by the cache itself.
///
/// Failures reported by a [`Connection`](crate::Connection) are not cache
/// errors: they are recorded in the entry and replayed like any other result.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The connection argument was omitted and no default connection is set
    #[error("Cannot execute query, connection not given and no default connection configured")]
    ConnectionNotConfigured,

    /// Configuration could not be parsed
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// IO error while loading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The dispatched query task did not run to completion
    #[error("Query dispatch failed: {0}")]
    DispatchFailed(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::InvalidConfig(err.to_string())
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
