//! Configuration module
//!
//! Settings are read from the environment (optionally seeded from a `.env` file).
//! Optional values fall back to defaults; required values fail fast in
//! [`Config::from_env`], and cross-field rules are checked by [`Config::validate`].

use std::env;
use std::time::Duration;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SIGNED_URL_TTL_SECS: u64 = 3600;

// Ingestion defaults
const INGEST_CONCURRENCY: usize = 8;
const INGEST_MAX_RETRIES: u32 = 3;
const INGEST_RETRY_DELAY_MS: u64 = 500;
const INGEST_BATCH_SIZE: usize = 2000;
const INGEST_FIRST_PAGE_SIZE: usize = 40;
const MAX_ARCHIVE_SIZE_MB: usize = 512;
const MAX_IMAGE_SIZE_MB: usize = 64;
const MAX_EXTRACTED_SIZE_MB: usize = 2048;

/// Postgres accepts at most 65535 bind parameters per statement.
const POSTGRES_MAX_BIND_PARAMS: usize = 65_535;
/// Parameters bound per image row (`dataset_id`, `storage_path`).
const IMAGE_ROW_PARAMS: usize = 2;
/// Largest insert batch that fits in one statement.
pub const MAX_BATCH_SIZE: usize = POSTGRES_MAX_BIND_PARAMS / IMAGE_ROW_PARAMS;

const MIB: usize = 1024 * 1024;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Tunables of the batch ingestion pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    /// Number of upload workers sharing the work queue.
    pub concurrency: usize,
    /// Total store-write attempts per entry (not additional retries).
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `retry_delay * 2^(n-1)` after failing.
    pub retry_delay: Duration,
    /// Maximum rows per insert call, at most [`MAX_BATCH_SIZE`].
    pub batch_size: usize,
    /// Largest archive accepted for ingestion, in bytes.
    pub max_archive_bytes: usize,
    /// Largest decompressed size of a single image entry, in bytes.
    pub max_image_bytes: u64,
    /// Largest decompressed size of all image entries of one archive, in bytes.
    pub max_extracted_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: INGEST_CONCURRENCY,
            max_retries: INGEST_MAX_RETRIES,
            retry_delay: Duration::from_millis(INGEST_RETRY_DELAY_MS),
            batch_size: INGEST_BATCH_SIZE,
            max_archive_bytes: MAX_ARCHIVE_SIZE_MB * MIB,
            max_image_bytes: (MAX_IMAGE_SIZE_MB * MIB) as u64,
            max_extracted_bytes: (MAX_EXTRACTED_SIZE_MB * MIB) as u64,
        }
    }
}

impl IngestConfig {
    fn from_env() -> Self {
        Self {
            concurrency: env::var("INGEST_CONCURRENCY")
                .unwrap_or_else(|_| INGEST_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(INGEST_CONCURRENCY),
            max_retries: env::var("INGEST_MAX_RETRIES")
                .unwrap_or_else(|_| INGEST_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(INGEST_MAX_RETRIES),
            retry_delay: Duration::from_millis(
                env::var("INGEST_RETRY_DELAY_MS")
                    .unwrap_or_else(|_| INGEST_RETRY_DELAY_MS.to_string())
                    .parse()
                    .unwrap_or(INGEST_RETRY_DELAY_MS),
            ),
            batch_size: env::var("INGEST_BATCH_SIZE")
                .unwrap_or_else(|_| INGEST_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(INGEST_BATCH_SIZE),
            max_archive_bytes: env_or("MAX_ARCHIVE_SIZE_MB", MAX_ARCHIVE_SIZE_MB) * MIB,
            max_image_bytes: (env_or("MAX_IMAGE_SIZE_MB", MAX_IMAGE_SIZE_MB) * MIB) as u64,
            max_extracted_bytes: (env_or("MAX_EXTRACTED_SIZE_MB", MAX_EXTRACTED_SIZE_MB) * MIB)
                as u64,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.concurrency == 0 {
            return Err(anyhow::anyhow!("INGEST_CONCURRENCY must be at least 1"));
        }
        if self.max_retries == 0 {
            return Err(anyhow::anyhow!("INGEST_MAX_RETRIES must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("INGEST_BATCH_SIZE must be at least 1"));
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(anyhow::anyhow!(
                "INGEST_BATCH_SIZE must be at most {} (Postgres bind parameter limit)",
                MAX_BATCH_SIZE
            ));
        }
        if self.max_archive_bytes == 0 || self.max_image_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_ARCHIVE_SIZE_MB and MAX_IMAGE_SIZE_MB must be at least 1"
            ));
        }
        if self.max_extracted_bytes < self.max_image_bytes {
            return Err(anyhow::anyhow!(
                "MAX_EXTRACTED_SIZE_MB must not be smaller than MAX_IMAGE_SIZE_MB"
            ));
        }
        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, Supabase, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Ingestion
    pub ingest: IngestConfig,
    pub first_page_size: usize,
    pub signed_url_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?;

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            ingest: IngestConfig::from_env(),
            first_page_size: env::var("INGEST_FIRST_PAGE_SIZE")
                .unwrap_or_else(|_| INGEST_FIRST_PAGE_SIZE.to_string())
                .parse()
                .unwrap_or(INGEST_FIRST_PAGE_SIZE),
            signed_url_ttl: Duration::from_secs(
                env::var("SIGNED_URL_TTL_SECS")
                    .unwrap_or_else(|_| SIGNED_URL_TTL_SECS.to_string())
                    .parse()
                    .unwrap_or(SIGNED_URL_TTL_SECS),
            ),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.ingest.validate()?;

        match self.storage_backend.unwrap_or(StorageBackend::S3) {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET must be set for the s3 backend"));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set for the s3 backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL must be set for the local backend"
                    ));
                }
            }
        }

        Ok(())
    }

    // Convenience getters for storage factory
    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }
}
