//! Rows of the `images` table as seen by the ingestion path.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row to insert: one uploaded object belonging to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImage {
    pub dataset_id: Uuid,
    pub storage_path: String,
}

/// Row returned by the database after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ImageRow {
    pub id: Uuid,
    pub storage_path: String,
}
