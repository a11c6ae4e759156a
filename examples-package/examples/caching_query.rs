//! Query Caching Example
//!
//! Demonstrates request coalescing, TTL expiry, capacity eviction and
//! statistics.

use anyhow::Result;
use async_trait::async_trait;
use query_cache::{CacheConfig, Connection, QueryCache};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Pretend database: every query takes `delay` and returns one row
struct SlowDatabase {
    delay: Duration,
    queries: AtomicUsize,
}

impl SlowDatabase {
    fn new(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::from_millis(delay_ms),
            queries: AtomicUsize::new(0),
        })
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for SlowDatabase {
    type Output = Value;
    type Error = String;

    async fn query(&self, sql: &str, params: &Value) -> Result<Value, String> {
        tokio::time::sleep(self.delay).await;
        self.queries.fetch_add(1, Ordering::SeqCst);
        if sql.contains("missing_table") {
            return Err(format!("table not found in '{}'", sql));
        }
        Ok(json!({ "query": sql, "params": params }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Query Caching Example ===\n");

    // Example 1: Concurrent identical queries
    coalescing().await?;

    // Example 2: Cache with TTL
    cache_with_ttl().await?;

    // Example 3: Capacity eviction and errors
    eviction_and_errors().await?;

    println!("\n=== All caching examples completed! ===");
    Ok(())
}

/// Example 1: ten callers, one database round trip
async fn coalescing() -> Result<()> {
    println!("--- Example 1: Coalescing ---\n");

    let db = SlowDatabase::new(200);
    let cache = Arc::new(QueryCache::new(CacheConfig::default()).with_connection(Arc::clone(&db)));

    let sql = "SELECT id, name FROM users WHERE active = ?";
    let mut handles = Vec::new();
    for _ in 0..10 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache.query_default(sql, json!([true])).await
        }));
    }

    let mut executed = 0;
    for handle in handles {
        let outcome = handle.await??;
        if !outcome.was_cached {
            executed += 1;
        }
    }

    println!("10 concurrent requests, {} dispatched", executed);
    println!("Database saw {} queries", db.queries());

    let again = cache.query_default(sql, json!([true])).await?;
    println!("Repeat request cached: {}", again.was_cached);

    Ok(())
}

/// Example 2: entries expire after the configured timeout
async fn cache_with_ttl() -> Result<()> {
    println!("\n--- Example 2: Cache with TTL ---\n");

    let db = SlowDatabase::new(0);
    let config = CacheConfig::default().with_ttl(Duration::from_millis(100));
    let cache = QueryCache::new(config).with_connection(Arc::clone(&db));

    let first = cache.query_sql("SELECT x FROM t").await?;
    println!("First request cached: {}", first.was_cached);

    let second = cache.query_sql("SELECT x FROM t").await?;
    println!("Immediate repeat cached: {}", second.was_cached);

    println!("Waiting for TTL expiration...");
    tokio::time::sleep(Duration::from_millis(150)).await;

    let third = cache.query_sql("SELECT x FROM t").await?;
    println!("After TTL cached: {} (entry expired)", third.was_cached);

    Ok(())
}

/// Example 3: max = 1 and a failing query
async fn eviction_and_errors() -> Result<()> {
    println!("\n--- Example 3: Eviction and Errors ---\n");

    let db = SlowDatabase::new(0);
    let cache = QueryCache::new(CacheConfig::new(1, 10_000)).with_connection(Arc::clone(&db));

    for sql in [
        "SELECT * FROM t1",
        "SELECT * FROM t2",
        "SELECT * FROM t2",
        "SELECT * FROM t1",
        "SELECT * FROM t1",
    ] {
        let outcome = cache.query_sql(sql).await?;
        println!("  {:<20} cached: {}", sql, outcome.was_cached);
    }

    for _ in 0..2 {
        let outcome = cache.query_sql("SELECT * FROM missing_table").await?;
        match outcome.result {
            Ok(_) => println!("  unexpected success"),
            Err(err) => println!("  error (cached: {}): {}", outcome.was_cached, err),
        }
    }

    let stats = cache.stats();
    println!("\nCache Statistics:");
    println!("  Hits:      {}", stats.hits());
    println!("  Misses:    {}", stats.misses());
    println!("  Hit Rate:  {:.1}%", stats.hit_rate() * 100.0);
    println!("  Evictions: {}", stats.evictions());
    println!("  Entries:   {}", stats.entry_count());

    cache.clear();
    println!("\nCache cleared! Entries: {}", cache.len());

    Ok(())
}
