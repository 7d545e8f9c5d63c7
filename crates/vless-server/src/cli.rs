//! CLI module for vless-server.
//!
//! This module provides the command-line interface that can be used either
//! as a standalone binary or as a subcommand of the main vless-rs CLI.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vless_auth::Identity;
use vless_config::{
    apply_overrides, load_or_default, validate_config, CliOverrides, Config, LoggingConfig,
};

use crate::subscription::{encode_subscription, subscription_links, LinkParams};
use crate::{run_with_shutdown, CancellationToken};

/// Server CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "vless-server", version, about = "VLESS over WebSocket relay")]
pub struct ServerArgs {
    /// Config file path (json/jsonc/yaml/toml); built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Arguments of the `links` command.
#[derive(Parser, Debug, Clone)]
pub struct LinksArgs {
    /// Config file path (json/jsonc/yaml/toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Public host to advertise when no domain is configured
    #[arg(long)]
    pub host: Option<String>,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

fn load(
    config: Option<&std::path::Path>,
    overrides: &CliOverrides,
) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = load_or_default(config)?;
    apply_overrides(&mut config, overrides);
    validate_config(&config)?;
    Ok(config)
}

/// Run the vless server with the given arguments.
///
/// This is the main entry point for the server CLI, used by both the
/// standalone binary and the unified vless-rs CLI.
pub async fn run(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(args.config.as_deref(), &args.overrides)?;

    init_tracing(&config.logging);

    // Set up graceful shutdown on SIGTERM/SIGINT
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();

    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    run_with_shutdown(config, shutdown).await?;
    Ok(())
}

/// Print the base64 subscription for the configured identity.
pub fn links(args: LinksArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(args.config.as_deref(), &args.overrides)?;
    println!("{}", render_links(&config, args.host.as_deref())?);
    Ok(())
}

fn render_links(config: &Config, host: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    let uuid = config
        .auth
        .uuid
        .as_deref()
        .ok_or("auth.uuid is not configured; links need a fixed identity")?;
    let identity = Identity::parse(uuid)?;
    let domain = config
        .subscription
        .domain
        .as_deref()
        .or(host)
        .ok_or("no domain configured; pass --host or --domain")?;
    let links = subscription_links(&LinkParams {
        identity: &identity,
        domain,
        port: config.subscription.port,
        ws_path: config.websocket.segment(),
        candidates: &config.subscription.candidates,
    });
    Ok(encode_subscription(&links))
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
/// Supports:
/// - `level`: Base log level (off, trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
/// - `filters`: Per-module log level overrides
pub fn init_tracing(config: &LoggingConfig) {
    let filter = build_filter(config);

    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    // A subscriber may already be installed (tests, embedding); keep it.
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
    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let base_level = config.level.as_deref().unwrap_or("info");
    let mut filter_str = base_level.to_string();

    // `off` silences everything, module filters included.
    if base_level != "off" {
        for (module, level) in &config.filters {
            filter_str.push(',');
            filter_str.push_str(module);
            filter_str.push('=');
            filter_str.push_str(level);
        }
    }

    EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"))
}
