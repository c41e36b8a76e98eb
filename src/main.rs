//! Traffic cache service.
//!
//! Reads newline-delimited JSON traffic reports from a TCP feed, keeps the
//! merged per-aircraft state in memory, and logs the status view periodically.

use std::{sync::Arc, time::Duration};

use clap::Parser;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trafficcache::{
    clock::SystemClock,
    config::CacheConfig,
    core::store::TrafficStore,
    ingest::{adapter::IngestAdapter, source::TcpLineSource},
    query::TrafficQueries,
    runtime::handle::spawn_traffic_cache,
};

#[derive(Parser)]
#[command(name = "trafficcache")]
#[command(about = "In-memory aircraft traffic cache", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Traffic feed address (host:port)
    #[arg(long, env = "TRAFFIC_INGEST_ADDR")]
    ingest_addr: Option<String>,

    /// Record TTL in milliseconds
    #[arg(long)]
    ttl_ms: Option<u64>,

    /// Eviction sweep period in milliseconds; 0 disables the sweeper
    #[arg(long)]
    sweep_interval_ms: Option<u64>,

    /// Seconds between status log lines; 0 disables them
    #[arg(long, default_value = "30")]
    status_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = CacheConfig::from_env()?;
    if let Some(addr) = cli.ingest_addr {
        config.ingest_addr = addr;
    }
    if let Some(ttl_ms) = cli.ttl_ms {
        config.ttl_ms = ttl_ms;
    }
    if let Some(sweep_interval_ms) = cli.sweep_interval_ms {
        config.sweep_interval_ms = sweep_interval_ms;
    }

    info!(
        ingest_addr = %config.ingest_addr,
        ttl_ms = config.ttl_ms,
        sweep_interval_ms = config.sweep_interval_ms,
        "starting traffic cache"
    );

    let handle = spawn_traffic_cache(TrafficStore::new(), Arc::new(SystemClock), config.clone());
    let adapter = IngestAdapter::new(
        TcpLineSource::new(config.ingest_addr.clone()).with_max_line_bytes(config.max_line_bytes),
        handle.clone(),
        config.reconnect_delay(),
    );
    let ingest = tokio::spawn(adapter.run());

    if cli.status_interval_secs > 0 {
        let status_handle = handle.clone();
        let period = Duration::from_secs(cli.status_interval_secs);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match status_handle.service_status().await {
                    Ok(status) => match serde_json::to_string(&status) {
                        Ok(json) => info!(status = %json, "traffic cache status"),
                        Err(err) => warn!(error = %err, "failed to encode status"),
                    },
                    Err(_) => break,
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.shutdown().await?;
    ingest.abort();

    Ok(())
}
