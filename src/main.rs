//! queue-watch - crowd and queue monitoring service
//!
//! Counts people per zone from detection frames, keeps bounded queues per
//! facility and serves pressure analysis, alerts and scores over HTTP.
//!
//! Module structure:
//! - `domain/` - Core types (facilities, zones, queue status)
//! - `io/` - External interfaces (detector, HTTP API, Prometheus)
//! - `services/` - Pipeline stages (counter, store, analyzer, alerts, scoring)
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::Parser;
use queue_watch::infra::{Config, Metrics};
use queue_watch::io::{start_api_server, Api, BoxDetector};
use queue_watch::services::QueueMonitor;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// queue-watch - crowd and queue monitoring service
#[derive(Parser, Debug)]
#[command(name = "queue-watch", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-request events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "queue-watch starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        max_queue_length = %config.max_queue_length(),
        minutes_per_person = %config.minutes_per_person(),
        history_len = %config.history_len(),
        growth_clamp = ?config.growth_clamp(),
        min_confidence = %config.min_confidence(),
        facilities = %config.facilities().len(),
        "config_loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.port())
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address(), config.port()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());
    let detector = Arc::new(BoxDetector::new(config.min_confidence()));
    let monitor = QueueMonitor::from_config(&config, detector, metrics.clone());
    info!(facilities = %monitor.facility_count(), "monitor_ready");

    let api = Arc::new(Api::new(monitor, metrics.clone()));

    // Start metrics reporter (lock-free reads)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    let mut reporter_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            tokio::select! {
                _ = interval.tick() => metrics_clone.report().log(),
                _ = reporter_shutdown.changed() => break,
            }
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_api_server(addr, api, shutdown_rx).await?;

    info!("queue-watch shutdown complete");
    Ok(())
}
