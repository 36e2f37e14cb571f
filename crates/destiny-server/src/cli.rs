//! CLI module for destiny-server.
//!
//! This module provides the command-line interface that can be used either
//! as a standalone binary or as a subcommand of the main destiny-rs CLI.

use std::io;
use std::path::PathBuf;

use clap::{Args, Parser};
use destiny_config::{
    CliOverrides, Config, LoggingConfig, apply_overrides, load_config, validate_config,
};
use destiny_metrics::record_error;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::ServerError;
use crate::maintenance::{MaintenanceReport, run_maintenance};
use crate::state::AppState;
use crate::{CancellationToken, run_with_shutdown};

/// Destiny server CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "destiny-server",
    version,
    about = "Destiny match HTTP service"
)]
pub struct ServerArgs {
    /// Config file path (json/jsonc/yaml/toml). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// One-shot maintenance arguments.
#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    /// Config file path (json/jsonc/yaml/toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override images.retention_days for this run.
    #[arg(long)]
    pub days: Option<u32>,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

fn resolve_config(
    path: Option<&PathBuf>,
    overrides: &CliOverrides,
) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, overrides);
    validate_config(&config)?;
    Ok(config)
}

/// Run the destiny server with the given arguments.
///
/// This is the main entry point for the server CLI, used by both the
/// standalone binary and the unified destiny-rs CLI.
pub async fn run(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args.config.as_ref(), &args.overrides)?;

    init_tracing(&config.logging);

    if let Some(listen) = &config.metrics.listen {
        match destiny_metrics::init_prometheus(listen) {
            Ok(()) => info!("metrics exporter listening on {} (/metrics)", listen),
            Err(e) => warn!("failed to start metrics exporter: {}", e),
        }
    }

    // Set up graceful shutdown on SIGTERM/SIGINT
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();

    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    if let Err(e) = run_with_shutdown(config, shutdown).await {
        record_error(e.error_type());
        error!(error = %e, "server stopped with error");
        return Err(e.into());
    }
    Ok(())
}

/// Run one maintenance pass and exit.
pub async fn run_cleanup(args: CleanupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = resolve_config(args.config.as_ref(), &args.overrides)?;
    if let Some(days) = args.days {
        config.images.retention_days = days;
    }

    init_tracing(&config.logging);

    if let Err(e) = cleanup(&config).await {
        record_error(e.error_type());
        error!(error = %e, "cleanup failed");
        return Err(e.into());
    }
    Ok(())
}

async fn cleanup(config: &Config) -> Result<MaintenanceReport, ServerError> {
    let state = AppState::from_config(config)?;
    let report = run_maintenance(&state).await;
    if let Some(scan_error) = &report.images.scan_error {
        return Err(ServerError::Cleanup(format!("bucket scan: {scan_error}")));
    }
    if !report.images.failed.is_empty() {
        return Err(ServerError::Cleanup(format!(
            "failed buckets: {}",
            report.images.failed.join(", ")
        )));
    }
    let usage = report.usage?;
    Ok(MaintenanceReport {
        images: report.images,
        usage: Ok(usage),
    })
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Initialize tracing subscriber with the given logging configuration.
///
/// - `level`: base level, default `info`
/// - `format`: `json`, `compact` or `pretty` (default)
/// - `output`: `stdout` or `stderr` (default)
/// - `filters`: per-module overrides
fn init_tracing(config: &LoggingConfig) {
    let base_level = config.level.as_deref().unwrap_or("info");
    let mut filter_str = base_level.to_string();

    for (module, level) in &config.filters {
        filter_str.push(',');
        filter_str.push_str(module);
        filter_str.push('=');
        filter_str.push_str(level);
    }

    let filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    // try_init: a second call (e.g. cleanup after serve in one process) is a no-op.
    let result = match (format, output) {
        ("json", "stdout") => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stdout))
            .try_init(),
        ("json", _) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        ("compact", "stdout") => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(io::stdout))
            .try_init(),
        ("compact", _) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(io::stderr))
            .try_init(),
        (_, "stdout") => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stdout))
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .try_init(),
    };
    if result.is_err() {
        warn!("tracing subscriber already initialized");
    }
}
