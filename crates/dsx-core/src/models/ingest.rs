//! Values produced and consumed during one ZIP ingestion run.
//!
//! Nothing here outlives a run: entries are moved into upload workers, outcomes
//! are folded into a report, and only the committed rows persist (in the database).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One image extracted from an archive.
///
/// `name` is the base filename (everything after the last `/` of the archive path).
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

// Bytes are elided so logging an entry never dumps image data.
impl std::fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("name", &self.name)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// An entry that could not be uploaded after all retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailedUpload {
    pub name: String,
    pub reason: String,
}

/// Result of uploading a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { storage_path: String },
    Failed { name: String, reason: String },
}

impl UploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }
}

/// A committed image row, zipped back with the path it was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertedImageRecord {
    pub id: Uuid,
    pub storage_path: String,
}

/// Final outcome of a whole ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub uploaded_count: usize,
    pub inserted_records: Vec<InsertedImageRecord>,
    pub failed: Vec<FailedUpload>,
}

impl IngestReport {
    /// Number of archive entries that took part in the run.
    pub fn total_files(&self) -> usize {
        self.uploaded_count + self.failed.len()
    }
}
