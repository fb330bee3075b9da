//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use dsx_core::Config;
use dsx_db::PgImageRepository;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        concurrency = config.ingest.concurrency,
        max_retries = config.ingest.max_retries,
        retry_delay_ms = config.ingest.retry_delay.as_millis() as u64,
        batch_size = config.ingest.batch_size,
        max_archive_bytes = config.ingest.max_archive_bytes,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let images = Arc::new(PgImageRepository::new(pool));
    let state = Arc::new(AppState::new(storage, images, &config));

    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
