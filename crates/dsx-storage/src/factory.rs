use crate::{Storage, StorageBackend, StorageError, StorageResult};
use dsx_core::Config;
use std::sync::Arc;

fn required<'a>(value: Option<&'a str>, name: &str) -> StorageResult<&'a str> {
    value.ok_or_else(|| StorageError::ConfigError(format!("{} not configured", name)))
}

/// Build the storage backend selected by `STORAGE_BACKEND` (S3 when unset).
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend().unwrap_or(StorageBackend::S3) {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = required(config.s3_bucket(), "S3_BUCKET")?;
            let region = required(
                config.s3_region().or_else(|| config.aws_region()),
                "S3_REGION or AWS_REGION",
            )?;
            let storage = crate::S3Storage::new(
                bucket.to_string(),
                region.to_string(),
                config.s3_endpoint().map(String::from),
            )
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = required(config.local_storage_path(), "LOCAL_STORAGE_PATH")?;
            let base_url = required(config.local_storage_base_url(), "LOCAL_STORAGE_BASE_URL")?;
            let storage = crate::LocalStorage::new(base_path, base_url.to_string()).await?;
            Ok(Arc::new(storage))
        }

        #[allow(unreachable_patterns)]
        backend => Err(StorageError::ConfigError(format!(
            "{} storage backend not compiled in",
            backend
        ))),
    }
}
