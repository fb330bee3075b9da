//! Application state shared by all handlers.

use dsx_core::Config;
use dsx_db::ImageRepository;
use dsx_ingest::IngestPipeline;
use dsx_storage::Storage;
use std::sync::Arc;
use std::time::Duration;

/// Request-facing settings taken from [`Config`] at startup.
#[derive(Clone, Debug)]
pub struct ApiSettings {
    /// Number of inserted images returned with signed URLs after ingestion.
    pub first_page_size: usize,
    pub signed_url_ttl: Duration,
    pub is_production: bool,
}

impl From<&Config> for ApiSettings {
    fn from(config: &Config) -> Self {
        Self {
            first_page_size: config.first_page_size,
            signed_url_ttl: config.signed_url_ttl,
            is_production: config.is_production(),
        }
    }
}

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub pipeline: IngestPipeline,
    pub settings: ApiSettings,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        images: Arc<dyn ImageRepository>,
        config: &Config,
    ) -> Self {
        Self::with_settings(storage, images, config.ingest.clone(), ApiSettings::from(config))
    }

    pub fn with_settings(
        storage: Arc<dyn Storage>,
        images: Arc<dyn ImageRepository>,
        ingest: dsx_core::IngestConfig,
        settings: ApiSettings,
    ) -> Self {
        Self {
            pipeline: IngestPipeline::new(storage.clone(), images, ingest),
            storage,
            settings,
        }
    }
}
