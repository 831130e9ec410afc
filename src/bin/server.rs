//! agent-dao HTTP server binary.
//!
//! Starts an axum HTTP server that exposes the agent registry dashboard.
//!
//! # Environment Variables
//!
//! - `DAO_CONFIG` — Optional YAML config file, overridden by the variables below
//! - `PORT` — HTTP port (default: 8080)
//! - `DAO_STORE` — Contract backend: "memory" (default) or "sqlite"
//! - `DAO_DB_PATH` — SQLite file (default: data/agent_dao.db)
//! - `DAO_CHAIN_ID` — Chain id reported by the local wallet (default: 31337)
//! - `DAO_WALLET_KEY` — Hex private key; without it the server is read-only
//! - `RUST_LOG` — Tracing filter (default: "info,agent_dao=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! # or persisted:
//! DAO_STORE=sqlite DAO_WALLET_KEY=0x... cargo run --bin server
//! ```

use std::sync::Arc;

use anyhow::Context;

use agent_dao::config::{DaoConfig, StoreBackend};
use agent_dao::contract::{ContractProvider, LocalProvider, MemoryContract, SqliteContract};
use agent_dao::controller::DaoController;
use agent_dao::server::{app_router, AppState};
use agent_dao::wallet::LocalWallet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agent_dao=debug".into()),
        )
        .init();

    let config = DaoConfig::from_env().context("failed to load configuration")?;
    let bind_addr = format!("0.0.0.0:{}", config.port);

    let provider: Arc<dyn ContractProvider> = match config.store {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory contract");
            Arc::new(LocalProvider::new(Arc::new(MemoryContract::new())))
        }
        StoreBackend::Sqlite => {
            tracing::info!("Using SQLite contract at {}", config.db_path.display());
            let contract = SqliteContract::open(&config.db_path)
                .with_context(|| format!("failed to open {}", config.db_path.display()))?;
            Arc::new(LocalProvider::new(Arc::new(contract)))
        }
    };

    let wallet = match config.wallet_key.as_deref() {
        Some(key) => Some(
            LocalWallet::from_private_key(key, config.chain_id)
                .context("DAO_WALLET_KEY is not a valid private key")?,
        ),
        None => {
            tracing::warn!("DAO_WALLET_KEY not set, mutations will be rejected");
            None
        }
    };

    let controller = DaoController::new(provider, config);
    if let Some(wallet) = wallet {
        controller.connect_wallet(Arc::new(wallet));
    }
    controller.initialize().await;

    let snapshot = controller.snapshot();
    tracing::info!(
        "Loaded {} agents ({} active, fund {})",
        snapshot.agents.len(),
        snapshot.active_agents,
        snapshot.fund_value
    );

    let app = app_router(AppState::new(controller));

    tracing::info!("agent-dao server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health              — liveness probe");
    tracing::info!("  GET  /agents              — dashboard state");
    tracing::info!("  POST /agents              — register an agent");
    tracing::info!("  POST /agents/:id/vote     — update vote");
    tracing::info!("  POST /agents/:id/toggle   — toggle status");
    tracing::info!("  POST /agents/:id/decrypt  — reveal vote");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
