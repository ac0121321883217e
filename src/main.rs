//! rpc-gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     GATEWAY                          │
//!   Client Request    │  ┌───────────┐   ┌──────────┐   ┌─────────────────┐  │
//!   ──────────────────┼─▶│ auth gate │──▶│ routing  │──▶│ rpc: marshal →  │──┼──▶ RPC backend
//!                     │  │ whitelist │   │          │   │ dispatch → TCP  │  │    (framed JSON)
//!                     │  └───────────┘   └────┬─────┘   └─────────────────┘  │
//!                     │                       │         ┌─────────────────┐  │
//!                     │                       └────────▶│ proxy: augment →│──┼──▶ HTTP service
//!                     │                                 │ retrying client │  │
//!   Client Response   │  ┌──────────────────────┐       └─────────────────┘  │
//!   ◀─────────────────┼──│ JSON / error envelope│                            │
//!                     │  └──────────────────────┘                            │
//!                     │   config (hot reload) · observability · lifecycle    │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use rpc_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use rpc_gateway::lifecycle::signals::shutdown_signal;
use rpc_gateway::observability::{logging, metrics};
use rpc_gateway::{GatewayBuilder, GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "rpc-gateway", version, about = "HTTP/JSON gateway for RPC backends")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rpc-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        backends = config.backends.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = tokio::sync::mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let state = GatewayBuilder::new(config).build()?;
    let server = GatewayServer::new(state);

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, config_updates, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
