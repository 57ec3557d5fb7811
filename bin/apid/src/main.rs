//! Opera read API daemon (apid)
//!
//! Connects to an Opera full node over WebSocket, follows new blocks and
//! transactions into the document store and keeps the repository facade
//! available until SIGTERM or SIGINT.
//!
//! ```text
//! ┌─────────────┐  ws   ┌──────────────────────────────────────┐
//! │  Full node  │◄─────►│                 apid                 │
//! └─────────────┘       │  ┌──────────────┐  ┌──────────────┐  │
//!                       │  │ Orchestrator │─►│ SQLite store │  │
//!                       │  └──────┬───────┘  └──────────────┘  │
//!                       │         ▼                            │
//!                       │  ┌──────────────┐  ┌──────────────┐  │
//!                       │  │  Repository  │◄─│   MemCache   │  │
//!                       │  └──────────────┘  └──────────────┘  │
//!                       └──────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! apid --config ./config.yaml
//! apid --config ./config.yaml --node-url wss://rpc.example.org --log-level debug
//! ```

mod cli;
mod wiring;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use opera_chain_client::{WsChainClient, WsClientConfig};
use opera_operations::{init_tracing_from_config, ApiConfig, ShutdownCoordinator, SignalHandler};
use opera_repository::{MemCache, Repository, SqliteDocumentStore};

use crate::cli::{resolve_config, Cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let _level = init_tracing_from_config(&config.observability)?;

    run(config).await
}

async fn run(config: ApiConfig) -> Result<(), Box<dyn Error>> {
    let chain = Arc::new(
        WsChainClient::connect(WsClientConfig::new(
            config.node.url.clone(),
            config.node.request_timeout(),
        ))
        .await?,
    );

    let store_config = wiring::store_config(&config.storage);
    if let Some(parent) = store_config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = Arc::new(SqliteDocumentStore::open(&store_config)?);
    let cache = Arc::new(MemCache::new(wiring::cache_config(&config.cache)));

    let repository = Arc::new(Repository::new(
        chain,
        store,
        cache,
        wiring::repository_config(&config),
    ));
    repository.start_sync();

    tracing::info!(
        node = %config.node.url,
        store = %store_config.path.display(),
        "api daemon running"
    );

    let signals = SignalHandler::new();
    signals.start();

    let coordinator = ShutdownCoordinator::new(config.operations.shutdown_timeout());
    coordinator.register(repository).await;

    let reason = signals.wait().await;
    tracing::info!(?reason, "shutting down");
    coordinator.shutdown().await?;

    tracing::info!("api daemon stopped");
    Ok(())
}
