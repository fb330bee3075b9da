//! `bulk-insert`: record already-uploaded objects as images of a dataset.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkInsertRequest {
    #[validate(required)]
    pub dataset_id: Option<Uuid>,
    #[validate(required)]
    pub storage_paths: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkInsertResponse {
    pub success: bool,
    pub count: usize,
    /// New row ids, in the order of `storagePaths`.
    pub inserted_ids: Vec<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/bulk-insert",
    tag = "ingestion",
    request_body = BulkInsertRequest,
    responses(
        (status = 200, description = "Rows inserted", body = BulkInsertResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 500, description = "Insert failed", body = ErrorResponse)
    )
)]
pub async fn bulk_insert(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<BulkInsertRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request
        .validate()
        .map_err(|_| HttpAppError::bad_request("Invalid payload"))?;
    let (Some(dataset_id), Some(storage_paths)) = (request.dataset_id, request.storage_paths)
    else {
        return Err(HttpAppError::bad_request("Invalid payload"));
    };

    let records = state
        .pipeline
        .committer()
        .commit(dataset_id, &storage_paths)
        .await?;

    tracing::info!(
        dataset_id = %dataset_id,
        count = records.len(),
        "Bulk insert completed"
    );

    Ok(Json(BulkInsertResponse {
        success: true,
        count: records.len(),
        inserted_ids: records.into_iter().map(|r| r.id).collect(),
    }))
}
