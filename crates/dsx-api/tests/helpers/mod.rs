//! Test helpers: router over in-memory storage and a recording image repository.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use dsx_api::setup::routes::setup_routes;
use dsx_api::{ApiSettings, AppState};
use dsx_core::models::{ImageRow, NewImage};
use dsx_core::{AppError, IngestConfig};
use dsx_db::ImageRepository;
use dsx_storage::{Storage, StorageBackend, StorageError, StorageResult};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use zip::write::{FileOptions, ZipWriter};

#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn put(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        self.put(storage_key, data.to_vec());
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
        Ok(self.contains(storage_key))
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "https://signed.test/{}?ttl={}",
            storage_key,
            expires_in.as_secs()
        ))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[derive(Default)]
pub struct MockImageRepository {
    pub calls: Mutex<Vec<Vec<NewImage>>>,
    pub fail: bool,
}

impl MockImageRepository {
    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl ImageRepository for MockImageRepository {
    async fn insert_many(&self, rows: &[NewImage]) -> Result<Vec<ImageRow>, AppError> {
        if self.fail {
            return Err(AppError::Internal("connection reset".to_string()));
        }
        self.calls.lock().unwrap().push(rows.to_vec());
        Ok(rows
            .iter()
            .map(|row| ImageRow {
                id: Uuid::new_v4(),
                storage_path: row.storage_path.clone(),
            })
            .collect())
    }
}

pub struct TestApp {
    pub router: Router,
    pub storage: Arc<MemoryStorage>,
    pub images: Arc<MockImageRepository>,
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(MockImageRepository::default(), 40)
}

pub fn test_ingest_config() -> IngestConfig {
    IngestConfig {
        concurrency: 2,
        retry_delay: Duration::from_millis(1),
        ..IngestConfig::default()
    }
}

pub fn setup_test_app_with(images: MockImageRepository, first_page_size: usize) -> TestApp {
    build_test_app(images, first_page_size, test_ingest_config())
}

pub fn setup_test_app_with_ingest(ingest: IngestConfig) -> TestApp {
    build_test_app(MockImageRepository::default(), 40, ingest)
}

fn build_test_app(
    images: MockImageRepository,
    first_page_size: usize,
    ingest: IngestConfig,
) -> TestApp {
    let storage = Arc::new(MemoryStorage::default());
    let images = Arc::new(images);
    let settings = ApiSettings {
        first_page_size,
        signed_url_ttl: Duration::from_secs(3600),
        is_production: false,
    };
    let state = Arc::new(AppState::with_settings(
        storage.clone(),
        images.clone(),
        ingest,
        settings,
    ));

    TestApp {
        router: setup_routes(state),
        storage,
        images,
    }
}

/// POST a JSON body and return the status with the parsed response body.
pub async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        for (name, data) in files {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer
}
