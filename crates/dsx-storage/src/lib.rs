//! Dataset Explorer Storage Library
//!
//! This crate provides the object-store abstraction used by the ingestion pipeline
//! and its implementations for S3-compatible stores and the local filesystem.
//!
//! # Storage key format
//!
//! Dataset images live under `{owner_id}/{collection_name}/{filename}`. Writes to an
//! existing key overwrite it, so re-uploading a file with the same name replaces the
//! earlier object instead of creating a duplicate.
//!
//! Keys must not contain a `..` segment or a leading `/`. Key generation is centralized in the
//! [`keys`] module so every backend and caller agrees on the layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use dsx_core::StorageBackend;
pub use factory::create_storage;
pub use keys::destination_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
