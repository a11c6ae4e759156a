use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod simulated;

use commands::*;
use config::Overrides;

#[derive(Parser)]
#[command(name = "qc")]
#[command(author, version, about = "Query Cache - coalescing result cache for async queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (JSON: timeout, max, enabled)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the cache timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Override the maximum number of cached entries
    #[arg(long, global = true)]
    max: Option<usize>,

    /// Bypass the cache entirely
    #[arg(long, global = true)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fire concurrent identical queries at a simulated connection
    Bench {
        /// SQL query to execute
        #[arg(short, long, default_value = "SELECT * FROM t")]
        sql: String,

        /// Query parameters as JSON
        #[arg(short, long, default_value = "[]")]
        params: String,

        /// Concurrent requests per round
        #[arg(short = 'n', long, default_value = "100")]
        concurrency: usize,

        /// Number of rounds
        #[arg(short, long, default_value = "3")]
        rounds: usize,

        /// Simulated query latency in milliseconds
        #[arg(short, long, default_value = "100")]
        delay_ms: u64,

        /// Make queries containing this text fail, to watch errors replay
        #[arg(long)]
        fail_on: Option<String>,
    },

    /// Run the max=1 eviction walkthrough
    Scenario {
        /// Simulated query latency in milliseconds
        #[arg(short, long, default_value = "10")]
        delay_ms: u64,
    },

    /// Print the effective configuration
    Config {
        /// Write the configuration to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    // Load configuration
    let overrides = Overrides {
        timeout_ms: cli.timeout_ms,
        max: cli.max,
        disable: cli.no_cache,
    };
    let cache_config = config::load(cli.config.as_deref(), &overrides)?;
    tracing::debug!("Effective cache config: {:?}", cache_config);

    print_banner();

    match cli.command {
        Some(Commands::Bench {
            sql,
            params,
            concurrency,
            rounds,
            delay_ms,
            fail_on,
        }) => {
            let params = serde_json::from_str(&params)?;
            run_benchmark(cache_config, &sql, params, concurrency, rounds, delay_ms, fail_on).await?;
        }
        Some(Commands::Scenario { delay_ms }) => {
            run_scenario(cache_config, delay_ms).await?;
        }
        Some(Commands::Config { output: Some(path) }) => {
            config::save(&cache_config, &path)?;
            println!("{} Wrote {}", "✓".bright_green(), path.display());
        }
        Some(Commands::Config { output: None }) | None => {
            show_config(&cache_config)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        "qc=debug,query_cli=debug,query_cache=debug"
    } else {
        "qc=info,query_cli=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        "Query Cache v0.1.0 - coalescing result cache".bright_yellow()
    );
    println!();
}
