//! Wayfare RPC Server - JSON-RPC operator interface for the response cache.
//!
//! Exposes cache statistics, maintenance (clear, cleanup, scheduled cleanup)
//! and direct entry get/set over JSON-RPC 2.0.

mod handlers;
mod server;
mod wrapper;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wayfare_core::config::AppConfig;
use wayfare_core::{CacheConfig, PathsConfig, ResponseCache};

#[derive(Parser, Debug)]
#[command(name = "wayfare-rpc")]
#[command(about = "JSON-RPC server for the Wayfare response cache")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, env = "WAYFARE_PORT", default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "WAYFARE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Cache database file (defaults to the user data directory)
    #[arg(long, env = "WAYFARE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Lifetime of cached responses, in seconds
    #[arg(long, env = "WAYFARE_CACHE_TTL_SECS", default_value = "604800")]
    cache_ttl_secs: u64,

    /// Minimum time between scheduled sweeps, in seconds
    #[arg(long, env = "WAYFARE_SWEEP_INTERVAL_SECS", default_value = "604800")]
    sweep_interval_secs: u64,

    /// How often to check whether a scheduled sweep is due, in seconds (0 = off)
    #[arg(long, env = "WAYFARE_SWEEP_CHECK_SECS", default_value = "0")]
    sweep_interval_check: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_logging(args: &Args) {
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the RPC_PORT handshake, logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if args.log_json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!("Starting {} RPC Server", AppConfig::APP_NAME);

    let config = CacheConfig::new()
        .with_default_ttl(Duration::from_secs(args.cache_ttl_secs))
        .with_sweep_interval(Duration::from_secs(args.sweep_interval_secs));

    let db_path = args.db_path.clone().unwrap_or_else(PathsConfig::default_db_path);
    info!("Cache database: {}", db_path.display());

    let cache = ResponseCache::open(&db_path, config)?;

    let sweeper = if args.sweep_interval_check > 0 {
        info!(
            "Checking for scheduled sweeps every {}s",
            args.sweep_interval_check
        );
        Some(server::spawn_sweep_scheduler(
            cache.clone(),
            Duration::from_secs(args.sweep_interval_check),
        ))
    } else {
        None
    };

    let addr = server::start_server(cache, &args.host, args.port).await?;

    // Port handshake for the parent process (intentional stdout)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    Ok(())
}
