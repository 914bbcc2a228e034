//! Server binary: explicit init, serve, graceful teardown.

use std::sync::Arc;

use conflux_core::cache::CacheProvider;
use conflux_core::config::ConfigManager;
use conflux_core::pipeline::PipelineEngine;
use conflux_core::web::{self, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    conflux_core::logging::init_structured_logging();

    let manager = ConfigManager::load()?;
    let config = Arc::new(manager.config().clone());

    let cache = Arc::new(CacheProvider::from_config(&config.cache).await?);
    let engine = PipelineEngine::new();
    let state = AppState::new(engine, cache, config);

    web::serve(state, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
