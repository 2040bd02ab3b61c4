//! # helphub-server
//!
//! Gamification and notification service for HelpHub.
//!
//! This binary provides:
//! - **REST API** (axum) that receives domain triggers, direct notification
//!   requests and on-demand job runs
//! - **Scheduler** firing the daily event sweeps and the monthly tournament
//!   formation and settlement
//! - **Unlock rewarder** turning achievement unlocks into points

mod api;
mod config;
mod error;
mod scheduler;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use helphub_engine::achievements::spawn_unlock_rewards;
use helphub_engine::assets::DirectoryIconResolver;
use helphub_engine::push::transport_for;
use helphub_engine::Engine;
use helphub_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,helphub_server=debug,helphub_engine=debug")
            }),
        )
        .init();

    info!("Starting HelpHub engine v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        api_enabled = config.api_token.is_some(),
        push_gateway = config.push_endpoint.is_some(),
        utc_offset_hours = config.utc_offset_hours,
        "Service settings"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = match config.database_path {
        Some(ref path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database opened");

    let transport = transport_for(
        config.push_endpoint.as_deref(),
        config.push_auth_token.clone(),
    )?;
    let icons = Arc::new(DirectoryIconResolver::new(
        config.medal_asset_dir.clone(),
        config.medal_asset_base_url.clone(),
    ));

    let (engine, unlocks) = Engine::new(
        Arc::new(Mutex::new(db)),
        transport,
        config.platform_hints(),
        icons,
        config.tournament_settings(),
    );

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------
    let _rewarder = spawn_unlock_rewards(engine.db().clone(), engine.ledger().clone(), unlocks);
    let _jobs = scheduler::spawn_all(engine.clone(), &config);

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let app_state = AppState {
        engine,
        config: Arc::new(config),
    };

    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
