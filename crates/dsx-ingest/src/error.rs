//! Errors that abort an ingestion run.
//!
//! Per-entry upload failures never surface here: they are collected into the
//! report. Only archive, persistence and cancellation failures end a run early.

use dsx_core::AppError;
use dsx_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Archive extraction failed: {0}")]
    Extraction(String),

    #[error("Archive is {size} bytes, larger than the {max} byte limit")]
    ArchiveTooLarge { size: usize, max: usize },

    /// An insert batch failed. Earlier batches stay committed; `orphaned` lists the
    /// uploaded paths that have no row.
    #[error("Persistence failed after {committed} rows: {message}")]
    Persistence {
        message: String,
        committed: usize,
        orphaned: Vec<String>,
    },

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Upload worker failed: {0}")]
    Worker(String),
}

impl IngestError {
    /// Pipeline stage the error came from, as shown to clients.
    pub fn phase(&self) -> &'static str {
        match self {
            IngestError::Extraction(_) => "extraction",
            IngestError::ArchiveTooLarge { .. } => "download",
            IngestError::Persistence { .. } => "persistence",
            IngestError::Cancelled => "cancelled",
            IngestError::InvalidInput(_) => "validation",
            IngestError::Storage(_) => "download",
            IngestError::Worker(_) => "upload",
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Extraction(msg) => AppError::ArchiveExtraction(msg),
            err @ IngestError::ArchiveTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            IngestError::Persistence {
                message, committed, ..
            } => AppError::Persistence { message, committed },
            IngestError::Cancelled => AppError::Cancelled,
            IngestError::InvalidInput(msg) => AppError::InvalidInput(msg),
            IngestError::Storage(e) => e.into(),
            IngestError::Worker(msg) => AppError::Internal(msg),
        }
    }
}
