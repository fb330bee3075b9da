//! Test helpers: in-memory storage, a recording image repository and ZIP fixtures.

use async_trait::async_trait;
use bytes::Bytes;
use dsx_core::models::{ImageRow, NewImage};
use dsx_core::{AppError, IngestConfig};
use dsx_db::ImageRepository;
use dsx_ingest::ProgressObserver;
use dsx_storage::{Storage, StorageBackend, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use zip::write::{FileOptions, ZipWriter};

/// Object store kept in a HashMap. Keys ending in one of `rejected` always fail.
#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub attempts: Mutex<HashMap<String, usize>>,
    pub content_types: Mutex<HashMap<String, String>>,
    rejected: HashSet<String>,
}

impl MemoryStorage {
    pub fn rejecting(names: &[&str]) -> Self {
        Self {
            rejected: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn attempts_for(&self, key: &str) -> usize {
        self.attempts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.objects.lock().unwrap().keys().any(|k| k.starts_with(prefix))
    }

    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.content_types.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(storage_key.to_string())
            .or_default() += 1;

        let name = storage_key.rsplit('/').next().unwrap_or(storage_key);
        if self.rejected.contains(name) {
            return Err(StorageError::UploadFailed(format!(
                "object {} rejected: corrupted payload",
                name
            )));
        }

        self.objects
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), data.to_vec());
        self.content_types
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), content_type.to_string());
        Ok(format!("mem://{}", storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(storage_key))
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!("mem://{}?expires={}", storage_key, expires_in.as_secs()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Records every `insert_many` call. Optionally fails the call with the given index.
#[derive(Default)]
pub struct MockImageRepository {
    pub calls: Mutex<Vec<Vec<NewImage>>>,
    fail_on_call: Option<usize>,
}

impl MockImageRepository {
    pub fn failing_on_call(index: usize) -> Self {
        Self {
            fail_on_call: Some(index),
            ..Self::default()
        }
    }

    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl ImageRepository for MockImageRepository {
    async fn insert_many(&self, rows: &[NewImage]) -> Result<Vec<ImageRow>, AppError> {
        let mut calls = self.calls.lock().unwrap();
        if self.fail_on_call == Some(calls.len()) {
            return Err(AppError::Internal("insert rejected".to_string()));
        }
        calls.push(rows.to_vec());
        Ok(rows
            .iter()
            .map(|row| ImageRow {
                id: Uuid::new_v4(),
                storage_path: row.storage_path.clone(),
            })
            .collect())
    }
}

/// Observer that keeps every reported percentage.
pub fn progress_recorder() -> (Arc<Mutex<Vec<u8>>>, Arc<dyn ProgressObserver>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let observer: Arc<dyn ProgressObserver> =
        Arc::new(move |percent: u8| sink.lock().unwrap().push(percent));
    (seen, observer)
}

/// Fast retries so failure paths do not slow the suite down.
pub fn test_config(concurrency: usize) -> IngestConfig {
    IngestConfig {
        concurrency,
        retry_delay: Duration::from_millis(1),
        ..IngestConfig::default()
    }
}

/// Build a ZIP in memory. Names ending in `/` become directory entries.
pub fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = FileOptions::default();
        for (name, data) in files {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }
    buffer
}
