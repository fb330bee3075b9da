//! `process-zip`: ingest an archive that the client already uploaded to storage.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use dsx_core::models::{FailedUpload, IngestReport};
use dsx_ingest::{IngestRequest, LogProgress};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const MISSING_FIELDS: &str = "Missing required fields";

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessZipRequest {
    #[validate(required, length(min = 1))]
    pub dataset_id: Option<String>,
    /// Collection segment of the destination keys.
    #[validate(required, length(min = 1))]
    pub dataset_name: Option<String>,
    #[validate(required, length(min = 1))]
    pub user_id: Option<String>,
    /// Storage key of the uploaded archive.
    #[validate(required, length(min = 1))]
    pub zip_path: Option<String>,
    /// Remove the archive from storage once its images are recorded.
    #[serde(default)]
    pub delete_archive: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub id: Uuid,
    pub storage_path: String,
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessZipResponse {
    pub success: bool,
    /// Rows created in the images table.
    pub inserted: usize,
    pub uploaded: usize,
    pub failed: Vec<FailedUpload>,
    /// First page of inserted images with signed URLs.
    pub thumbnails: Vec<Thumbnail>,
}

#[utoipa::path(
    post,
    path = "/functions/v1/process-zip",
    tag = "ingestion",
    request_body = ProcessZipRequest,
    responses(
        (status = 200, description = "Archive ingested", body = ProcessZipResponse),
        (status = 400, description = "Missing fields or unreadable archive", body = ErrorResponse),
        (status = 413, description = "Archive larger than MAX_ARCHIVE_SIZE_MB", body = ErrorResponse),
        (status = 499, description = "Ingestion cancelled", body = ErrorResponse),
        (status = 500, description = "Archive download or persistence failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn process_zip(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ProcessZipRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request
        .validate()
        .map_err(|_| HttpAppError::bad_request(MISSING_FIELDS))?;

    let (Some(dataset_id), Some(dataset_name), Some(user_id), Some(zip_path)) = (
        request.dataset_id,
        request.dataset_name,
        request.user_id,
        request.zip_path,
    ) else {
        return Err(HttpAppError::bad_request(MISSING_FIELDS));
    };

    let dataset_id = Uuid::parse_str(&dataset_id)
        .map_err(|_| HttpAppError::bad_request("datasetId must be a UUID"))?;

    let ingest_request = IngestRequest {
        dataset_id,
        owner_id: user_id,
        collection_name: dataset_name,
    };

    // Dropping the request future (client gone) cancels the run.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let report = state
        .pipeline
        .ingest_stored_archive(
            &ingest_request,
            &zip_path,
            Arc::new(LogProgress::new(dataset_id.to_string())),
            cancel,
        )
        .await?;

    if request.delete_archive {
        if let Err(e) = state.storage.delete(&zip_path).await {
            tracing::warn!(error = %e, key = %zip_path, "Failed to delete ingested archive");
        }
    }

    let thumbnails = first_page_thumbnails(&state, &report).await;

    Ok(Json(ProcessZipResponse {
        success: true,
        inserted: report.inserted_records.len(),
        uploaded: report.uploaded_count,
        failed: report.failed,
        thumbnails,
    }))
}

/// Sign the first page of inserted images. Signing failures only cost the preview.
async fn first_page_thumbnails(state: &AppState, report: &IngestReport) -> Vec<Thumbnail> {
    let page: Vec<_> = report
        .inserted_records
        .iter()
        .take(state.settings.first_page_size)
        .collect();
    if page.is_empty() {
        return Vec::new();
    }

    let keys: Vec<String> = page.iter().map(|r| r.storage_path.clone()).collect();
    match state
        .storage
        .presigned_urls(&keys, state.settings.signed_url_ttl)
        .await
    {
        Ok(urls) => page
            .into_iter()
            .zip(urls)
            .map(|(record, url)| Thumbnail {
                id: record.id,
                storage_path: record.storage_path.clone(),
                url,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, count = keys.len(), "Failed to sign thumbnail URLs");
            Vec::new()
        }
    }
}
