//! Storyforge API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use storyforge_api::config::{ServerConfig, StorageBackend};
use storyforge_api::error::AppError;
use storyforge_api::state::AppState;
use storyforge_api::{app, telemetry};
use storyforge_core::clock::SystemClock;
use storyforge_store::{InMemoryStoryStore, PgStoryStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

async fn build_state(storage: &StorageBackend) -> Result<AppState, AppError> {
    let clock = Arc::new(SystemClock);
    match storage {
        StorageBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .connect(database_url)
                .await?;
            let store = PgStoryStore::new(pool);
            store.migrate().await?;
            info!(max_connections, "connected to PostgreSQL and applied migrations");
            Ok(AppState::new(clock, Arc::new(store)))
        }
        StorageBackend::Memory => {
            warn!("using the in-memory store; data will not survive a restart");
            Ok(AppState::new(clock, Arc::new(InMemoryStoryStore::new())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = ServerConfig::from_env()?;
    let _telemetry = telemetry::init(&config)?;

    info!("Starting Storyforge API server");

    let state = build_state(&config.storage).await?;

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let router = app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
