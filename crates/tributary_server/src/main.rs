//! Tributary server: streams AI completions to browser clients.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tributary_core::{TracingConfig, init_tracing};
use tributary_server::{AppConfig, AppState, InMemoryUsageSink, router};

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "tributary-server")]
#[command(about = "Tributary - streamed AI completion service")]
#[command(version)]
struct Args {
    /// Additional configuration file, applied over the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides `server.bind`)
    #[arg(short, long)]
    bind: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Log filter used when RUST_LOG is unset (overrides `logging.log_level`)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = &args.bind {
        config = config.with_bind(bind.clone());
    }
    let logging = TracingConfig {
        log_level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging().log_level.clone()),
        json_logs: args.json_logs || config.logging().json_logs,
    };
    init_tracing(&logging).context("Failed to initialize logging")?;
    let config = config.with_logging(logging);

    info!("Starting Tributary server");
    if config.upstream().api_key().is_none() {
        tracing::warn!("No provider API key configured; completions will be rejected upstream");
    }

    let usage = Arc::new(InMemoryUsageSink::new());
    let state = AppState::from_config(&config, usage).context("Failed to build application state")?;
    let sweeper = state
        .limiter()
        .spawn_sweeper(config.rate_limit().sweep_interval());

    let listener = TcpListener::bind(config.server().bind().as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.server().bind()))?;
    info!(bind = %config.server().bind(), "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
