//! Batched recording of uploaded paths as `images` rows.

use dsx_core::models::{InsertedImageRecord, NewImage};
use dsx_db::ImageRepository;
use std::sync::Arc;
use uuid::Uuid;

use crate::IngestError;

/// Rows per insert call unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

pub struct BulkCommitter {
    images: Arc<dyn ImageRepository>,
    batch_size: usize,
}

impl BulkCommitter {
    pub fn new(images: Arc<dyn ImageRepository>, batch_size: usize) -> Self {
        Self { images, batch_size }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Insert one row per path, `batch_size` rows per insert call, chunks in order.
    ///
    /// Returned records follow the input order, each carrying its new row id.
    /// Batches are committed independently: if one fails, earlier batches stay
    /// and the error reports how many rows were committed and which paths were
    /// left without a row.
    #[tracing::instrument(skip(self, storage_paths), fields(dataset_id = %dataset_id, paths = storage_paths.len()))]
    pub async fn commit(
        &self,
        dataset_id: Uuid,
        storage_paths: &[String],
    ) -> Result<Vec<InsertedImageRecord>, IngestError> {
        if self.batch_size == 0 {
            return Err(IngestError::InvalidInput(
                "batch size must be at least 1".to_string(),
            ));
        }

        let mut records = Vec::with_capacity(storage_paths.len());
        for (batch, chunk) in storage_paths.chunks(self.batch_size).enumerate() {
            let rows: Vec<NewImage> = chunk
                .iter()
                .map(|path| NewImage {
                    dataset_id,
                    storage_path: path.clone(),
                })
                .collect();

            let inserted = match self.images.insert_many(&rows).await {
                Ok(inserted) if inserted.len() == chunk.len() => inserted,
                Ok(inserted) => {
                    return Err(self.failure(
                        format!(
                            "batch {} inserted {} rows, expected {}",
                            batch,
                            inserted.len(),
                            chunk.len()
                        ),
                        storage_paths,
                        records.len(),
                    ))
                }
                Err(e) => return Err(self.failure(e.to_string(), storage_paths, records.len())),
            };

            records.extend(chunk.iter().zip(inserted).map(|(path, row)| InsertedImageRecord {
                id: row.id,
                storage_path: path.clone(),
            }));

            tracing::debug!(batch = batch, rows = chunk.len(), committed = records.len(), "Committed image batch");
        }

        Ok(records)
    }

    fn failure(&self, message: String, storage_paths: &[String], committed: usize) -> IngestError {
        let orphaned = storage_paths[committed..].to_vec();
        tracing::error!(
            error = %message,
            committed = committed,
            orphaned = orphaned.len(),
            "Image batch insert failed; uploaded objects without rows remain in storage"
        );
        IngestError::Persistence {
            message,
            committed,
            orphaned,
        }
    }
}
