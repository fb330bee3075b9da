//! Dataset Explorer Database Layer
//!
//! Persistence for the ingestion path: the `ImageRepository` seam the pipeline
//! commits through, and its PostgreSQL implementation.

pub mod db;
pub mod traits;

pub use db::PgImageRepository;
pub use traits::ImageRepository;
