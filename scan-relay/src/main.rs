//! scan-relay binary entry point.
//!
//! Usage:
//! ```bash
//! scan-relay --config relay.toml
//! scan-relay --bind 0.0.0.0:3001 --bind 127.0.0.1:3002
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use scan_relay::config::Config;
use scan_relay::error::RelayError;
use scan_relay::server::PairRelay;
use scan_relay::{cleanup, heartbeat, http};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Desktop/mobile pairing relay.
#[derive(Parser, Debug)]
#[command(name = "scan-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults apply if omitted and relay.toml is absent)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Listen address; repeat for several listeners. Overrides the config file.
    #[arg(long)]
    bind: Vec<String>,
}

fn load_config(cli: &Cli) -> Result<Config, RelayError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => {
            let default = PathBuf::from("relay.toml");
            if default.exists() {
                Config::from_file(&default)?
            } else {
                Config::default()
            }
        }
    };
    if !cli.bind.is_empty() {
        config.server.bind_addresses = cli.bind.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scan_relay=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    http::health::init_start_time();
    let relay = Arc::new(PairRelay::new(config.clone()));

    let _heartbeat = heartbeat::spawn_heartbeat_task(Arc::clone(&relay), config.heartbeat.clone());
    let _cleanup = cleanup::spawn_cleanup_task(Arc::clone(&relay), config.cleanup.clone());

    let router = http::build_router(Arc::clone(&relay));
    if relay.config().llm.credential_configured() {
        tracing::info!("LLM credential configured");
    } else {
        tracing::info!(
            "LLM not configured - set {} for real AI replies",
            relay.config().llm.api_key_env
        );
    }

    let mut servers = tokio::task::JoinSet::new();
    for addr in &config.server.bind_addresses {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let local = listener.local_addr()?;
        tracing::info!(
            "Relay listening on http://{}{}",
            local,
            config.server.ws_path
        );
        let router = router.clone();
        servers.spawn(async move { axum::serve(listener, router).await });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
        Some(result) = servers.join_next() => {
            result
                .context("listener task panicked")?
                .context("listener failed")?;
        }
    }

    servers.abort_all();
    Ok(())
}
