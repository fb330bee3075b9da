//! Upload worker: writes one archive entry to storage with bounded retries.

use bytes::Bytes;
use dsx_core::models::{ArchiveEntry, UploadOutcome};
use dsx_storage::{destination_key, Storage};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::archive::content_type_for;

/// Failure reason recorded for entries abandoned because the run was cancelled.
pub const CANCELLED_REASON: &str = "cancelled";

/// Where the entries of one run are written: `{owner_id}/{collection_name}/{filename}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub owner_id: String,
    pub collection_name: String,
}

impl Destination {
    pub fn new(owner_id: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            collection_name: collection_name.into(),
        }
    }

    pub fn key_for(&self, filename: &str) -> String {
        destination_key(&self.owner_id, &self.collection_name, filename)
    }
}

/// Delay to wait after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

pub struct UploadWorker {
    storage: Arc<dyn Storage>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl UploadWorker {
    /// `max_retries` is the total number of attempts per entry; zero is treated as one.
    pub fn new(storage: Arc<dyn Storage>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            storage,
            max_attempts: max_retries.max(1),
            retry_delay,
        }
    }

    /// Upload one entry, retrying failed writes with exponential backoff.
    ///
    /// Never returns an error: an entry that still fails after the last attempt, or
    /// whose backoff is interrupted by `cancel`, comes back as
    /// [`UploadOutcome::Failed`] with the reason.
    pub async fn upload(
        &self,
        entry: ArchiveEntry,
        destination: &Destination,
        cancel: &CancellationToken,
    ) -> UploadOutcome {
        let storage_path = destination.key_for(&entry.name);
        let content_type = content_type_for(&entry.name);
        let size = entry.bytes.len();
        let data = Bytes::from(entry.bytes);
        let name = entry.name;

        let mut attempt = 1;
        loop {
            let start = std::time::Instant::now();
            match self
                .storage
                .upload_with_key(&storage_path, data.clone(), content_type)
                .await
            {
                Ok(_) => {
                    tracing::debug!(
                        key = %storage_path,
                        size_bytes = size,
                        attempt = attempt,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Uploaded archive entry"
                    );
                    return UploadOutcome::Uploaded { storage_path };
                }
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        error = %e,
                        key = %storage_path,
                        attempts = attempt,
                        "Giving up on archive entry"
                    );
                    return UploadOutcome::Failed {
                        name,
                        reason: e.to_string(),
                    };
                }
                Err(e) => {
                    let delay = backoff_delay(self.retry_delay, attempt);
                    tracing::warn!(
                        error = %e,
                        key = %storage_path,
                        attempt = attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "Upload attempt failed, retrying"
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return UploadOutcome::Failed {
                                name,
                                reason: CANCELLED_REASON.to_string(),
                            };
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}
