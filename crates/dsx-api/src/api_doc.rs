//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use dsx_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dataset Explorer ingestion API",
        version = "0.1.0",
        description = "Bulk ingestion of image datasets: unpack uploaded ZIP archives into object storage and record each image in the dataset."
    ),
    paths(
        handlers::process_zip::process_zip,
        handlers::bulk_insert::bulk_insert,
        handlers::health::health_check,
    ),
    components(
        schemas(
            handlers::process_zip::ProcessZipRequest,
            handlers::process_zip::ProcessZipResponse,
            handlers::process_zip::Thumbnail,
            handlers::bulk_insert::BulkInsertRequest,
            handlers::bulk_insert::BulkInsertResponse,
            handlers::health::HealthCheckResponse,
            models::FailedUpload,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "ingestion", description = "ZIP ingestion and bulk image registration"),
        (name = "health", description = "Service health checks"),
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
