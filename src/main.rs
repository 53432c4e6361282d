//! Round-robin reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request     ┌──────────┐    ┌──────────────────┐    ┌───────────┐
//!     ──────────────────▶│  axum    │───▶│ BackendRegistry  │───▶│  forward  │──────▶ Backend
//!                        │  server  │    │  select_next()   │    │ (hyper)   │
//!     Client Response    │          │    └──────────────────┘    │           │
//!     ◀──────────────────│          │◀───────────────────────────│  stream   │◀────── Backend
//!                        └──────────┘                            └───────────┘
//! ```
//!
//! Backends are fixed at startup; changing them requires a restart.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use round_robin_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use round_robin_proxy::lifecycle::{signals, Shutdown};
use round_robin_proxy::observability::logging;
use round_robin_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "round-robin-proxy")]
#[command(about = "Reverse proxy that spreads requests over fixed backends in turn", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(short, long)]
    listen: Option<String>,

    /// Backend URL; repeat in rotation order. Replaces `backends` from the file.
    #[arg(short, long = "backend")]
    backends: Vec<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if !self.backends.is_empty() {
            config.backends = self.backends;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.logging)?;

    tracing::info!("round-robin-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        connect_timeout_secs = ?config.timeouts.connect_secs,
        "Configuration loaded"
    );

    let server = HttpServer::new(config).map_err(|e| {
        tracing::error!(error = %e, "Invalid backend configuration");
        e
    })?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown.clone());

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
