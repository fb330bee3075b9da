//! Dataset Explorer Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every dsx component: storage backends, the image repository, the ingestion
//! pipeline and the HTTP surface.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, IngestConfig, MAX_BATCH_SIZE};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
