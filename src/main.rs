//! coinfile server
//!
//! ```text
//!   client ──▶ http (axum router, request id, trace, limits)
//!                │
//!                ├─▶ files ──▶ storage (Supabase Storage | local dir)
//!                │      └────▶ db (PostgREST | memory + snapshot)
//!                ├─▶ tiers ──▶ blockchain (token balance)
//!                ├─▶ payments ─▶ blockchain (signatures, transactions)
//!                │       └─────▶ db (used-payment ledger, atomic claim)
//!                └─▶ mint ──▶ blockchain (build, sign, send, confirm)
//!                       └───▶ storage (metadata JSON)
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use coinfile::config::loader::{apply_env_overrides, load_config};
use coinfile::config::validation::validate_config;
use coinfile::config::watcher::ConfigWatcher;
use coinfile::config::AppConfig;
use coinfile::lifecycle::{build_state, shutdown_signal, Shutdown};
use coinfile::observability::{logging, metrics};
use coinfile::HttpServer;

#[derive(Parser)]
#[command(name = "coinfile", version, about = "Token-gated file host")]
struct Args {
    /// Path to the TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "COINFILE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = AppConfig::default();
            apply_env_overrides(&mut config);
            validate_config(&config).map_err(coinfile::config::loader::ConfigError::Validation)?;
            config
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "coinfile starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        storage = ?config.storage.backend,
        database = ?config.database.backend,
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

    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (updates, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable; hot reload disabled");
                    (updates, None)
                }
            }
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = build_state(config)?;
    let store = state.store.clone();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(state);
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Server exited with error"),
        Err(e) => tracing::error!(error = %e, "Server task panicked"),
    }

    if let Err(e) = store.flush().await {
        tracing::error!(error = %e, "Failed to flush metadata store");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
