use std::sync::Arc;

use showcase_api::config::config;
use showcase_api::database::DatabaseManager;
use showcase_api::services::LocalStorage;
use showcase_api::{app, init_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = config();
    tracing::info!("Starting Showcase API in {:?} mode", config.environment);

    // Lazy pool: the server comes up even if the database is not reachable yet
    let pool = DatabaseManager::main_pool().await?;
    let storage = Arc::new(LocalStorage::new(&config.storage.upload_dir));
    let state = AppState::build(config, pool, storage)?;
    let observers = state.observers.clone();

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Showcase API listening on http://{}", bind_addr);

    axum::serve(listener, app(state, config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // let post-commit notifications finish before the pool goes away
    observers.drain().await;
    DatabaseManager::close_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
