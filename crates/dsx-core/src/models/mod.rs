pub mod image;
pub mod ingest;

pub use image::{ImageRow, NewImage};
pub use ingest::{ArchiveEntry, FailedUpload, IngestReport, InsertedImageRecord, UploadOutcome};
