//! webhost: application-hosting HTTP server (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                       WEBHOST                         │
//!                        │                                                       │
//!   config.toml ─────────┼─▶ config ──▶ deploy::plan ──▶ deploy::listener        │
//!        │               │    (load,      (initial /        (mutation calls)     │
//!        │ notify        │   validate)      diff)                  │             │
//!        └───────────────┼─▶ watcher ─────────┘                    ▼             │
//!                        │                                 ┌──────────────┐      │
//!   Client Request       │  ┌─────────┐   ┌──────────┐     │    mapper    │      │
//!   ─────────────────────┼─▶│  http   │──▶│ lookup   │────▶│ RoutingTable │      │
//!                        │  │ server  │   │ (pooled) │     │ (ArcSwap)    │      │
//!                        │  └─────────┘   └────┬─────┘     └──────────────┘      │
//!   Client Response      │                     ▼                  ▲              │
//!   ◀────────────────────┼──  redirect / 404 / 503 / endpoint     │              │
//!                        │                                        │              │
//!   Operator ────────────┼─▶ admin API (status, hosts, lookup) ───┘              │
//!                        │                                                       │
//!                        │   lifecycle (signals, shutdown) · observability       │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use webhost::admin::{setup_admin_router, AdminState};
use webhost::config::{load_config, watcher::ConfigWatcher, ServerConfig};
use webhost::lifecycle::{signals::shutdown_on_signal, Shutdown};
use webhost::observability::{logging, metrics};
use webhost::HttpServer;

#[derive(Parser)]
#[command(name = "webhost")]
#[command(about = "Application-hosting HTTP server", long_about = None)]
struct Args {
    /// TOML configuration file; watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    logging::init_logging(&config.observability.log_level);

    tracing::info!("webhost v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        hosts = config.hosts.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    tokio::spawn(shutdown_on_signal(Arc::clone(&shutdown)));

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = HttpServer::new(config.clone());

    if config.admin.enabled {
        let admin_state = AdminState::new(Arc::clone(server.table()), &config.admin.api_key);
        let admin = setup_admin_router(admin_state);
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let mut admin_shutdown = shutdown.subscribe();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            let served = axum::serve(admin_listener, admin)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
