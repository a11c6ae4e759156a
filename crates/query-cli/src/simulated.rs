//! A stand-in database connection with configurable latency

use async_trait::async_trait;
use query_cache::Connection;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Answers every query after `delay`, echoing the query back as a row
pub struct SimulatedConnection {
    delay: Duration,
    fail_pattern: Option<String>,
    executions: AtomicUsize,
}

impl SimulatedConnection {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_pattern: None,
            executions: AtomicUsize::new(0),
        }
    }

    /// Fail every query whose text contains `pattern`
    pub fn failing_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_pattern = Some(pattern.into());
        self
    }

    /// How many queries actually reached the connection
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for SimulatedConnection {
    type Output = Value;
    type Error = String;

    async fn query(&self, sql: &str, params: &Value) -> Result<Value, String> {
        let n = self.executions.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Executing #{}: {} {}", n, sql, params);
        tokio::time::sleep(self.delay).await;

        match &self.fail_pattern {
            Some(pattern) if sql.contains(pattern.as_str()) => {
                Err(format!("simulated failure for '{}'", sql))
            }
            _ => Ok(json!({ "query": sql, "params": params, "execution": n })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_query() {
        let conn = SimulatedConnection::new(Duration::ZERO);
        let row = conn.query("SELECT 1", &json!([7])).await.unwrap();

        assert_eq!(row["query"], "SELECT 1");
        assert_eq!(row["params"], json!([7]));
        assert_eq!(row["execution"], 1);
        assert_eq!(conn.executions(), 1);
    }

    #[tokio::test]
    async fn test_failing_pattern() {
        let conn = SimulatedConnection::new(Duration::ZERO).failing_on("broken");

        assert!(conn.query("SELECT * FROM broken", &json!([])).await.is_err());
        assert!(conn.query("SELECT * FROM fine", &json!([])).await.is_ok());
        assert_eq!(conn.executions(), 2);
    }
}
