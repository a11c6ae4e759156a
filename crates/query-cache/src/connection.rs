//! The executor seam the cache sits in front of

use async_trait::async_trait;
use serde_json::Value;

/// Something that can run a query, such as a database connection.
///
/// Each call must eventually yield exactly one result or error. Both are
/// opaque to the cache, which stores and replays them verbatim.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Result of a successful query
    type Output: Send;
    /// Error reported by a failed query
    type Error: Send;

    /// Execute `sql` with the given parameters
    async fn query(&self, sql: &str, params: &Value) -> Result<Self::Output, Self::Error>;
}
