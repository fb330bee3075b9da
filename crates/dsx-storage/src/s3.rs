use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};
use std::time::{Duration, Instant};

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Dataset storage on S3 or an S3-compatible endpoint (MinIO, Supabase storage).
///
/// Credentials come from the standard AWS environment variables.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    public_base: String,
}

impl S3Storage {
    /// `endpoint_url` selects an S3-compatible provider, e.g. `http://localhost:9000`;
    /// plain-http endpoints are allowed for local development.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(&region)
            .with_bucket_name(&bucket);

        // Path-style URLs on custom endpoints, virtual-hosted style on AWS.
        let public_base = match endpoint_url {
            Some(endpoint) => {
                builder = builder
                    .with_allow_http(endpoint.starts_with("http://"))
                    .with_endpoint(&endpoint);
                format!("{}/{}", endpoint.trim_end_matches('/'), bucket)
            }
            None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
        };

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        tracing::debug!(bucket = %bucket, base = %public_base, "S3 storage configured");

        Ok(S3Storage {
            store,
            bucket,
            public_base,
        })
    }

    fn location(key: &str) -> Path {
        Path::from(key)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        let start = Instant::now();
        let size_bytes = data.len();

        // Served back through signed URLs, so the object carries its MIME type.
        let options = PutOptions {
            attributes: Attributes::from_iter([(
                Attribute::ContentType,
                AttributeValue::from(content_type.to_string()),
            )]),
            ..PutOptions::default()
        };

        // PUT replaces whatever is stored under the key.
        if let Err(e) = ObjectStore::put_opts(
            &self.store,
            &Self::location(storage_key),
            PutPayload::from(data),
            options,
        )
        .await
        {
            tracing::warn!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes,
                duration_ms = elapsed_ms(start),
                "S3 put failed"
            );
            return Err(StorageError::UploadFailed(e.to_string()));
        }

        tracing::debug!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %content_type,
            size_bytes,
            duration_ms = elapsed_ms(start),
            "S3 put succeeded"
        );

        Ok(format!("{}/{}", self.public_base, storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let start = Instant::now();

        let object = match self.store.get(&Self::location(storage_key)).await {
            Ok(object) => object,
            Err(ObjectStoreError::NotFound { .. }) => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 get failed"
                );
                return Err(StorageError::DownloadFailed(e.to_string()));
            }
        };

        let bytes = object
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = bytes.len(),
            duration_ms = elapsed_ms(start),
            "S3 get succeeded"
        );

        Ok(bytes.to_vec())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.store
            .delete(&Self::location(storage_key))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %storage_key, "S3 delete failed");
                StorageError::DeleteFailed(e.to_string())
            })?;

        tracing::info!(bucket = %self.bucket, key = %storage_key, "S3 object deleted");
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        match self.store.head(&Self::location(storage_key)).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let url = self
            .store
            .signed_url(Method::GET, &Self::location(storage_key), expires_in)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        Ok(url.to_string())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
