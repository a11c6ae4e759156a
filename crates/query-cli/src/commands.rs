use crate::simulated::SimulatedConnection;
use anyhow::Result;
use colored::Colorize;
use futures::future::join_all;
use query_cache::{CacheConfig, CacheStats, QueryCache, QueryOutcome};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

type Cache = QueryCache<Value, String>;

fn build_cache(
    config: CacheConfig,
    delay: Duration,
    fail_on: Option<String>,
) -> (Cache, Arc<SimulatedConnection>) {
    let conn = match fail_on {
        Some(pattern) => SimulatedConnection::new(delay).failing_on(pattern),
        None => SimulatedConnection::new(delay),
    };
    let conn = Arc::new(conn);
    let cache = QueryCache::new(config).with_connection(Arc::clone(&conn));
    (cache, conn)
}

fn cached_label(was_cached: bool) -> colored::ColoredString {
    if was_cached {
        "cached".bright_green()
    } else {
        "executed".bright_yellow()
    }
}

/// Fire `concurrency` identical queries at once, `rounds` times in a row
pub async fn run_benchmark(
    config: CacheConfig,
    sql: &str,
    params: Value,
    concurrency: usize,
    rounds: usize,
    delay_ms: u64,
    fail_on: Option<String>,
) -> Result<()> {
    println!(
        "{} Running {} rounds of {} concurrent queries ({}ms simulated latency)...",
        "→".bright_blue(),
        rounds,
        concurrency,
        delay_ms
    );
    println!("Query: {} {}\n", sql.bright_white(), params);

    let (cache, conn) = build_cache(config, Duration::from_millis(delay_ms), fail_on);
    let mut round_times = Vec::with_capacity(rounds);

    for round in 1..=rounds {
        let start = Instant::now();
        let outcomes = join_all(
            (0..concurrency).map(|_| cache.query_default(sql, params.clone())),
        )
        .await;
        let elapsed = start.elapsed();
        round_times.push(elapsed);

        let outcomes = outcomes.into_iter().collect::<query_cache::Result<Vec<_>>>()?;
        let dispatched = outcomes.iter().filter(|o| !o.was_cached).count();
        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();

        println!(
            "  Round {:>3}: {:>8.2}ms  dispatched {}  served from cache {}  errors {}",
            round,
            elapsed.as_secs_f64() * 1000.0,
            dispatched,
            outcomes.len() - dispatched,
            failed
        );
    }

    let total: Duration = round_times.iter().sum();
    println!();
    println!("{}", "Benchmark Results:".bright_green().bold());
    println!("{}", "─".repeat(50));
    println!("  Requests:       {}", rounds * concurrency);
    println!("  Executions:     {}", conn.executions());
    println!("  Total time:     {:.2}ms", total.as_secs_f64() * 1000.0);
    if rounds > 0 {
        println!(
            "  Avg per round:  {:.2}ms",
            total.as_secs_f64() * 1000.0 / rounds as f64
        );
    }
    print_stats(&cache.stats());
    println!("{}", "─".repeat(50));

    info!(
        "Benchmark finished: {} requests, {} executions",
        rounds * concurrency,
        conn.executions()
    );
    Ok(())
}

/// Walk through the capacity-eviction scenario with `max = 1`
pub async fn run_scenario(config: CacheConfig, delay_ms: u64) -> Result<()> {
    let config = config.with_max_entries(1);
    println!(
        "{} Capacity scenario (max = {}, timeout = {}ms)\n",
        "→".bright_blue(),
        config.max_entries,
        config.ttl.as_millis()
    );

    let (cache, conn) = build_cache(config, Duration::from_millis(delay_ms), None);
    let steps = [
        "SELECT * FROM t1",
        "SELECT * FROM t2",
        "SELECT * FROM t2",
        "SELECT * FROM t1",
        "SELECT * FROM t1",
    ];

    for (i, sql) in steps.iter().enumerate() {
        let outcome: QueryOutcome<Value, String> = cache.query_sql(sql).await?;
        println!(
            "  {}. {:<20} {}  (entries: {})",
            i + 1,
            sql,
            cached_label(outcome.was_cached),
            cache.len()
        );
    }

    println!();
    println!("  Executions: {}", conn.executions());
    print_stats(&cache.stats());
    Ok(())
}

/// Print the effective configuration as JSON
pub fn show_config(config: &CacheConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn print_stats(stats: &CacheStats) {
    println!("  Hits:           {}", stats.hits());
    println!("  Misses:         {}", stats.misses());
    println!("  Coalesced:      {}", stats.coalesced());
    println!("  Evictions:      {}", stats.evictions());
    println!("  Expirations:    {}", stats.expirations());
    println!("  Hit rate:       {:.1}%", stats.hit_rate() * 100.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fail_on_pattern_is_replayed() {
        let (cache, conn) =
            build_cache(CacheConfig::default(), Duration::ZERO, Some("broken".to_string()));

        let first = cache.query_sql("SELECT * FROM broken").await.unwrap();
        let second = cache.query_sql("SELECT * FROM broken").await.unwrap();
        assert!(!first.was_cached);
        assert!(second.was_cached);
        assert_eq!(first.result, second.result);
        assert!(second.result.is_err());

        assert!(cache.query_sql("SELECT * FROM fine").await.unwrap().is_ok());
        assert_eq!(conn.executions(), 2);
    }
}
