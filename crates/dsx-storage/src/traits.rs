//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use dsx_core::AppError;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// The ingestion pipeline only ever talks to object storage through this trait,
/// so tests can substitute an in-memory or failing store.
///
/// **Key format:** `{owner_id}/{collection_name}/{filename}`. See the crate root
/// documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write data to a specific storage key, replacing any existing object.
    /// Returns the public URL for the uploaded file.
    ///
    /// Backends with object metadata store `content_type` with the object; the
    /// local backend has none and relies on the file extension when serving.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Generate a presigned/temporary URL for direct access (GET)
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Sign several keys at once. Output order matches `storage_keys`.
    async fn presigned_urls(
        &self,
        storage_keys: &[String],
        expires_in: Duration,
    ) -> StorageResult<Vec<String>> {
        let mut urls = Vec::with_capacity(storage_keys.len());
        for key in storage_keys {
            urls.push(self.get_presigned_url(key, expires_in).await?);
        }
        Ok(urls)
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
