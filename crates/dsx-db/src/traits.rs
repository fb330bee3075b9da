//! Repository trait abstractions
//!
//! The ingestion pipeline depends on these traits rather than on concrete
//! repositories, so it can be exercised without a database.

use async_trait::async_trait;
use dsx_core::models::{ImageRow, NewImage};
use dsx_core::AppError;

/// Bulk insertion into the `images` table.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert all rows in one statement and return the created rows.
    ///
    /// The returned rows are in the same order as `rows`, so callers can zip
    /// database ids back onto their inputs index-for-index.
    async fn insert_many(&self, rows: &[NewImage]) -> Result<Vec<ImageRow>, AppError>;
}
