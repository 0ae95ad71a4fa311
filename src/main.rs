use anyhow::{Context, Result};
use clap::Parser;
use knowledge_relay::{api, config, logging, platform::OpenAiClient};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Ports tried in order when no port is configured.
const FALLBACK_PORTS: std::ops::RangeInclusive<u16> = 8000..=8099;

#[derive(Parser)]
#[command(
    name = "knowledge-relay",
    about = "Relay document uploads and chat questions to a hosted assistant platform"
)]
struct Cli {
    /// Port to listen on; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Path of a dotenv file to load instead of `./.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config =
        config::load(cli.env_file.as_deref()).context("failed to load configuration")?;
    logging::init_tracing();
    if let Some(port) = cli.port {
        config.server_port = Some(port);
    }
    tracing::debug!(config = ?config, "Loaded configuration");

    let config = Arc::new(config);
    let platform =
        Arc::new(OpenAiClient::new(&config).context("failed to build assistant platform client")?);
    let app = api::create_router(Arc::clone(&config), platform);

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("failed to bind listener")?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Listening on http://0.0.0.0:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// A configured port is used as-is; otherwise the first free port of [`FALLBACK_PORTS`] wins.
fn candidate_ports(configured: Option<u16>) -> Vec<u16> {
    match configured {
        Some(port) => vec![port],
        None => FALLBACK_PORTS.collect(),
    }
}

async fn bind_listener(configured: Option<u16>) -> std::io::Result<(TcpListener, u16)> {
    let candidates = candidate_ports(configured);
    let last = candidates.len().saturating_sub(1);
    for (index, port) in candidates.into_iter().enumerate() {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse && index < last => {
                tracing::debug!(port, "Port already in use; trying next");
            }
            Err(err) => return Err(err),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "no candidate port available",
    ))
}

/// Resolve on Ctrl+C or SIGTERM so in-flight relays can finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
