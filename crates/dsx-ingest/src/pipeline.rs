//! End-to-end ingestion of one archive.

use dsx_core::models::IngestReport;
use dsx_core::IngestConfig;
use dsx_db::ImageRepository;
use dsx_storage::Storage;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::archive::{extract_images, ExtractionLimits};
use crate::commit::BulkCommitter;
use crate::pool::run_pool;
use crate::progress::{ProgressObserver, ProgressTracker};
use crate::upload::{Destination, UploadWorker};
use crate::IngestError;

/// Identifies the dataset an archive is ingested into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub dataset_id: Uuid,
    pub owner_id: String,
    pub collection_name: String,
}

impl IngestRequest {
    fn validate(&self) -> Result<(), IngestError> {
        if self.owner_id.trim().is_empty() {
            return Err(IngestError::InvalidInput("owner id is required".to_string()));
        }
        if self.collection_name.trim().is_empty() {
            return Err(IngestError::InvalidInput(
                "collection name is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Extract, upload and commit pipeline over a storage backend and an image
/// repository.
pub struct IngestPipeline {
    storage: Arc<dyn Storage>,
    committer: BulkCommitter,
    config: IngestConfig,
}

impl IngestPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        images: Arc<dyn ImageRepository>,
        config: IngestConfig,
    ) -> Self {
        let committer = BulkCommitter::new(images, config.batch_size);
        Self {
            storage,
            committer,
            config,
        }
    }

    pub fn committer(&self) -> &BulkCommitter {
        &self.committer
    }

    /// Ingest an archive that was uploaded to storage under `archive_key`.
    ///
    /// Archives larger than [`IngestConfig::max_archive_bytes`] are rejected before
    /// extraction.
    pub async fn ingest_stored_archive(
        &self,
        request: &IngestRequest,
        archive_key: &str,
        observer: Arc<dyn ProgressObserver>,
        cancel: CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        request.validate()?;
        let archive = self.storage.download(archive_key).await?;
        if archive.len() > self.config.max_archive_bytes {
            tracing::warn!(
                key = %archive_key,
                size_bytes = archive.len(),
                max_bytes = self.config.max_archive_bytes,
                "Archive exceeds size limit"
            );
            return Err(IngestError::ArchiveTooLarge {
                size: archive.len(),
                max: self.config.max_archive_bytes,
            });
        }
        tracing::info!(
            key = %archive_key,
            size_bytes = archive.len(),
            "Downloaded archive"
        );
        self.ingest_archive(request, archive, observer, cancel).await
    }

    /// Ingest an in-memory ZIP archive.
    ///
    /// Upload failures of individual entries do not fail the run; they are listed
    /// in [`IngestReport::failed`]. Nothing is committed if `cancel` fires before
    /// the upload phase ends.
    #[tracing::instrument(
        skip(self, request, archive, observer, cancel),
        fields(dataset_id = %request.dataset_id, owner_id = %request.owner_id, collection = %request.collection_name)
    )]
    pub async fn ingest_archive(
        &self,
        request: &IngestRequest,
        archive: Vec<u8>,
        observer: Arc<dyn ProgressObserver>,
        cancel: CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        request.validate()?;
        let start = std::time::Instant::now();

        let limits = ExtractionLimits::from(&self.config);
        let entries = tokio::task::spawn_blocking(move || extract_images(&archive, &limits))
            .await
            .map_err(|e| IngestError::Worker(format!("archive extraction task failed: {}", e)))??;

        let total = entries.len();
        tracing::info!(images = total, "Starting archive ingestion");

        let progress = Arc::new(ProgressTracker::new(total, observer));
        progress.report_empty();

        let worker = Arc::new(UploadWorker::new(
            self.storage.clone(),
            self.config.max_retries,
            self.config.retry_delay,
        ));
        let destination = Arc::new(Destination::new(
            request.owner_id.clone(),
            request.collection_name.clone(),
        ));

        let pool = run_pool(
            entries,
            worker,
            destination,
            self.config.concurrency,
            progress,
            cancel.clone(),
        )
        .await?;

        if cancel.is_cancelled() {
            tracing::warn!(
                uploaded = pool.uploaded.len(),
                "Ingestion cancelled before commit; uploaded objects were not recorded"
            );
            return Err(IngestError::Cancelled);
        }

        let inserted_records = self
            .committer
            .commit(request.dataset_id, &pool.uploaded)
            .await?;

        let report = IngestReport {
            uploaded_count: pool.uploaded.len(),
            inserted_records,
            failed: pool.failed,
        };

        tracing::info!(
            total = total,
            uploaded = report.uploaded_count,
            inserted = report.inserted_records.len(),
            failed = report.failed.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive ingestion finished"
        );

        Ok(report)
    }
}
