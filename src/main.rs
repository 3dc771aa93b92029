//! V.O.M landing page server
//!
//! Serves the landing page with its interactive demo widgets and records
//! email subscriptions in the hosted subscriber table.
//!
//! Module structure:
//! - `domain/` - Core types and fixed demo copy
//! - `io/` - External interfaces (HTTP server, HTML rendering, PostgREST client)
//! - `services/` - Widget state machines, sessions, subscription client
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use vom_landing::infra::{Config, Metrics};
use vom_landing::io::{start_http_server, AppState, PostgrestStore};
use vom_landing::services::{SessionRegistry, SubscriberStore, SubscriptionClient};

/// V.O.M landing page with simulated demo widgets
#[derive(Parser, Debug)]
#[command(name = "vom-landing", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up SUPABASE_URL / SUPABASE_ANON_KEY from .env when present
    dotenvy::dotenv().ok();

    // Default: INFO, use RUST_LOG=debug for per-action visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "vom-landing starting");

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config);
    let config = Config::load_from_path(&config_path).with_env_overrides();

    info!(
        config_file = %config.config_file(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        subscription_url = ?config.subscription_url(),
        subscription_table = %config.subscription_table(),
        session_idle_timeout_secs = %config.session_idle_timeout_secs(),
        max_sessions = %config.max_sessions(),
        "config_loaded"
    );

    // Missing or malformed credentials abort startup
    let store: Arc<dyn SubscriberStore> =
        Arc::new(PostgrestStore::new(&config).context("Failed to build subscription client")?);

    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.port())
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address(), config.port()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());
    let registry = Arc::new(SessionRegistry::new(
        Duration::from_secs(config.session_idle_timeout_secs()),
        config.max_sessions(),
        metrics.clone(),
    ));

    // Expire idle sessions
    let sweep_interval = Duration::from_secs(config.session_sweep_interval_secs().max(1));
    tokio::spawn(registry.clone().run_sweeper(sweep_interval, shutdown_rx.clone()));

    // Periodic metrics summary
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let state = Arc::new(AppState {
        registry,
        subscription: SubscriptionClient::new(store).with_metrics(metrics.clone()),
        metrics: metrics.clone(),
    });

    start_http_server(addr, state, shutdown_rx).await.map_err(|e| anyhow::anyhow!(e))?;

    metrics.report().log();
    info!("vom-landing shutdown complete");
    Ok(())
}
