//! Image repository: bulk inserts into the images table.

use async_trait::async_trait;
use dsx_core::models::{ImageRow, NewImage};
use dsx_core::AppError;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::traits::ImageRepository;

/// Repository for the images table.
#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    #[tracing::instrument(skip(self, rows), fields(db.table = "images", count = rows.len()))]
    async fn insert_many(&self, rows: &[NewImage]) -> Result<Vec<ImageRow>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO images (dataset_id, storage_path) ");
        builder.push_values(rows, |mut row_builder, row| {
            row_builder
                .push_bind(row.dataset_id)
                .push_bind(row.storage_path.clone());
        });
        builder.push(" RETURNING id, storage_path");

        let inserted: Vec<ImageRow> = builder
            .build_query_as::<ImageRow>()
            .fetch_all(&self.pool)
            .await?;

        order_like_input(rows, inserted)
    }
}

/// Reorder RETURNING rows to follow the input order.
///
/// PostgreSQL does not promise that RETURNING follows VALUES order, so rows are
/// matched back by storage path. Duplicate paths are interchangeable: each one is
/// a fresh row pointing at the same object.
fn order_like_input(input: &[NewImage], returned: Vec<ImageRow>) -> Result<Vec<ImageRow>, AppError> {
    if returned.len() != input.len() {
        return Err(AppError::Internal(format!(
            "Inserted {} image rows but {} were returned",
            input.len(),
            returned.len()
        )));
    }

    let mut by_path: HashMap<String, VecDeque<Uuid>> = HashMap::with_capacity(returned.len());
    for row in returned {
        by_path.entry(row.storage_path).or_default().push_back(row.id);
    }

    input
        .iter()
        .map(|row| {
            by_path
                .get_mut(&row.storage_path)
                .and_then(VecDeque::pop_front)
                .map(|id| ImageRow {
                    id,
                    storage_path: row.storage_path.clone(),
                })
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "No inserted row returned for storage path {}",
                        row.storage_path
                    ))
                })
        })
        .collect()
}
