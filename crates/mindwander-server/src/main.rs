//! Mindwander server - shared real-time distraction counter.

use anyhow::Result;
use clap::Parser;
use mindwander_server::{config, logging, routes, state};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use config::Config;
use logging::{LogConfig, LogFormat};
use state::AppState;

/// Mindwander server - participants count distractions while an admin runs the session clock.
#[derive(Parser, Debug)]
#[command(name = "mindwander-server")]
#[command(about = "HTTP/WebSocket server for the shared distraction counter")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the admin secret from config
    #[arg(long, value_name = "SECRET")]
    admin_secret: Option<String>,

    /// Override the classification grace period (milliseconds)
    #[arg(long = "grace-ms", value_name = "MS")]
    grace_ms: Option<u64>,

    /// Enable verbose logging (INFO level for most targets)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging (DEBUG level, excludes ping traces)
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging (TRACE level for everything)
    #[arg(long)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "registry=debug" or "ws::ping=trace").
    /// Can be specified multiple times. Targets are prefixed with "mindwander::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(secret) = cli.admin_secret {
        config.admin_secret = secret;
    }
    if let Some(grace_ms) = cli.grace_ms {
        config.classification_grace_ms = grace_ms;
    }

    tracing::info!(
        target: "mindwander::startup",
        "Loaded configuration (port: {}, grace: {}ms)",
        config.port,
        config.classification_grace_ms
    );
    if config.uses_default_secret() {
        tracing::warn!(target: "mindwander::startup", "Using the built-in default admin secret; set admin_secret in the config file");
    }

    let state = Arc::new(AppState::new(config.clone()));
    tracing::info!(target: "mindwander::startup", "Initialized session state");

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(target: "mindwander::startup", "Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(target: "mindwander::startup", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "mindwander::startup", "Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!(target: "mindwander::startup", "Shutdown signal received");
}
