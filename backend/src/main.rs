//! brygga server.

use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use brygga::config::{CliOverrides, Config};
use brygga::{serve_with_shutdown, state::AppState};

/// brygga - MCP tools over HTTP + server-sent events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT and config files)
    #[arg(short, long)]
    port: Option<u16>,

    /// Additional TOML config file
    #[arg(short, long, env = "BRYGGA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration before logging so the log settings can come from it
    let config = Config::from_figment(CliOverrides {
        port: args.port,
        config_file: args.config,
        log_file: args.log_file,
        log_level: args.log_level,
    })?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config)?;
    info!("Configuration loaded");

    let state = AppState::from_config(&config);

    // Bind to all interfaces unless configured otherwise
    let addr = SocketAddr::new(config.host, config.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Set up graceful shutdown handler
    let signal_state = state.clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        let stats = signal_state.broker().stats();
        info!(
            "Received Ctrl+C, shutting down gracefully ({} staged, {} bound streams open)",
            stats.staged, stats.bound
        );
    };

    serve_with_shutdown(listener, state, shutdown_signal).await?;

    info!("Server shut down");
    Ok(())
}

/// Initialize logging - configured level, else RUST_LOG, else info.
fn init_logging(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match config.log_level {
        Some(ref level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stdout_layer = fmt::layer().with_target(false).compact();

    let (file_layer, guard) = match config.log_file {
        Some(ref path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(UtcTime::new(Rfc3339));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
