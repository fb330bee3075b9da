//! Dataset Explorer API Library
//!
//! HTTP surface of the ingestion pipeline: the `process-zip` function endpoint,
//! the `bulk-insert` route and a health probe, plus application setup.

mod api_doc;
mod handlers;
pub mod setup;
mod telemetry;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::{ApiSettings, AppState};
