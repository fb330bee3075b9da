use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::io::AsyncWriteExt;

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Dataset storage on the local filesystem. Keys map to paths below `root`.
///
/// Files carry no metadata, so the content type passed on upload is not stored;
/// whatever serves `public_base` derives it from the extension.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalStorage {
    /// Creates `root` if needed. `public_base` is the URL prefix files are served
    /// under, e.g. `http://localhost:4000/datasets`.
    pub async fn new(root: impl Into<PathBuf>, public_base: String) -> StorageResult<Self> {
        let root = root.into();
        if let Err(e) = fs::create_dir_all(&root).await {
            return Err(StorageError::ConfigError(format!(
                "cannot create storage root {}: {}",
                root.display(),
                e
            )));
        }

        Ok(LocalStorage {
            root,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a key below the root, refusing anything that could escape it.
    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let escapes = key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|segment| segment == "..");
        if escapes {
            return Err(StorageError::InvalidKey(format!("rejected key {:?}", key)));
        }

        let path = self.root.join(key);
        let root = self
            .root
            .canonicalize()
            .map_err(|e| StorageError::ConfigError(format!("storage root unavailable: {}", e)))?;

        // Existing paths may be symlinks; make sure they still land inside the root.
        match path.canonicalize() {
            Ok(real) if !real.starts_with(&root) => Err(StorageError::InvalidKey(format!(
                "key {:?} resolves outside the storage root",
                key
            ))),
            _ => Ok(path),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }

    async fn is_file(path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.resolve(storage_key)?;
        let start = Instant::now();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }

        // Truncating write: an existing object under the key is replaced.
        let mut file = fs::File::create(&path).await?;
        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            return Err(StorageError::UploadFailed(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!(
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = elapsed_ms(start),
            "Wrote object to local storage"
        );

        Ok(self.public_url(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(storage_key)?;
        let start = Instant::now();

        if !Self::is_file(&path).await {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = elapsed_ms(start),
            "Read object from local storage"
        );

        Ok(data)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        if !Self::is_file(&path).await {
            return Ok(());
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("{}: {}", path.display(), e)))?;

        tracing::info!(key = %storage_key, "Removed object from local storage");
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.resolve(storage_key)?;
        Ok(Self::is_file(&path).await)
    }

    /// Local files are not signed; the public URL is returned as is.
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        self.resolve(storage_key)?;
        Ok(self.public_url(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::keys::destination_key;
    use tempfile::tempdir;

    async fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "http://localhost:4000/datasets".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_upload_download() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let key = destination_key("user-1", "cats", "a.jpg");
        let url = storage
            .upload_with_key(&key, Bytes::from_static(b"jpeg bytes"), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:4000/datasets/user-1/cats/a.jpg");
        assert_eq!(storage.download(&key).await.unwrap(), b"jpeg bytes".to_vec());
    }

    #[tokio::test]
    async fn test_upload_overwrites_existing_key() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let key = destination_key("user-1", "cats", "a.jpg");
        storage
            .upload_with_key(&key, Bytes::from_static(b"first version"), "image/jpeg")
            .await
            .unwrap();
        storage
            .upload_with_key(&key, Bytes::from_static(b"second"), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(storage.download(&key).await.unwrap(), b"second".to_vec());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let result = storage.download("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .upload_with_key("/etc/passwd", Bytes::new(), "text/plain")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let result = storage.download("user-1/cats/missing.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let key = "user-1/uploads/batch.zip";
        assert!(!storage.exists(key).await.unwrap());

        storage
            .upload_with_key(key, Bytes::from_static(b"PK"), "application/zip")
            .await
            .unwrap();
        assert!(storage.exists(key).await.unwrap());

        storage.delete(key).await.unwrap();
        assert!(!storage.exists(key).await.unwrap());

        // Second delete is a no-op
        storage.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn test_presigned_urls_preserve_order() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let keys = vec![
            "user-1/cats/b.png".to_string(),
            "user-1/cats/a.png".to_string(),
        ];
        let urls = storage
            .presigned_urls(&keys, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(
            urls,
            vec![
                "http://localhost:4000/datasets/user-1/cats/b.png".to_string(),
                "http://localhost:4000/datasets/user-1/cats/a.png".to_string(),
            ]
        );
    }
}
