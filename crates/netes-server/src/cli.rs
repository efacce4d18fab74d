//! CLI module for netes-server.
//!
//! This module provides the command-line interface that can be used either
//! as a standalone binary or as a subcommand of the main netes-rs CLI.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use netes_cluster::HttpLookup;
use netes_config::{
    CliOverrides, LoggingConfig, apply_env, apply_overrides, load_or_default, validate_config,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{CancellationToken, NodeProxyBuilder, run_with_shutdown};

/// netes server CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "netes-server", version, about = "Multi-tenant control-plane proxy")]
pub struct ServerArgs {
    /// Config file path (json/yaml/toml). Built-in defaults when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the netes server with the given arguments.
///
/// This is the main entry point for the server CLI, used by both the
/// standalone binary and the unified netes-rs CLI.
pub async fn run(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, &args.overrides);
    apply_env(&mut config);
    validate_config(&config)?;

    init_tracing(&config.logging);

    if config.tunnel.access_key.is_none() || config.tunnel.secret_key.is_none() {
        warn!("relay credentials not configured, tunnel dials will be unauthenticated");
    }

    if let Some(listen) = &config.metrics.listen {
        match netes_metrics::init_prometheus(listen) {
            Ok(()) => info!("metrics exporter listening on {}", listen),
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

    let lookup = HttpLookup::new(&config.directory.url, config.directory.timeout())?;
    info!(directory = %config.directory.url, relay = %config.tunnel.dial_url, "cluster directory configured");

    run_with_shutdown(config, lookup, NodeProxyBuilder, shutdown).await?;
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            // Fall back to waiting forever
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
/// Supports:
/// - `level`: Base log level (trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
/// - `filters`: Per-module log level overrides
pub fn init_tracing(config: &LoggingConfig) {
    let filter = build_filter(config);
    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    match (format, output) {
        ("json", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
        }
        ("json", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        ("compact", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stdout))
                .init();
        }
        ("compact", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        (_, "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

/// Base level plus per-module overrides, falling back to `info` when invalid.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut directives = config.level.as_deref().unwrap_or("info").to_string();
    for (module, level) in &config.filters {
        directives.push(',');
        directives.push_str(module);
        directives.push('=');
        directives.push_str(level);
    }
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
}
