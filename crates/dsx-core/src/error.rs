//! Error types module
//!
//! All cross-crate failures are unified under [`AppError`]. Crate-local error enums
//! (storage, ingestion) convert into it at their boundaries, and the HTTP layer
//! renders it through [`ErrorMetadata`].
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Level at which the HTTP layer logs an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

/// How an error is presented to API clients.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable code clients can match on, e.g. `PERSISTENCE_ERROR`.
    fn error_code(&self) -> &'static str;

    /// True when retrying the same request may succeed.
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to clients.
    fn client_message(&self) -> String;

    /// Sensitive errors never expose internal details in production.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Archive extraction failed: {0}")]
    ArchiveExtraction(String),

    #[error("Persistence failed after {committed} rows: {message}")]
    Persistence { message: String, committed: usize },

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

struct Presentation {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

const RETRY_LATER: Option<&str> = Some("Retry after a short delay");

impl Presentation {
    const fn server(code: &'static str) -> Self {
        Presentation {
            status: 500,
            code,
            recoverable: true,
            action: RETRY_LATER,
            sensitive: true,
            level: LogLevel::Error,
        }
    }

    const fn client(status: u16, code: &'static str, action: &'static str) -> Self {
        Presentation {
            status,
            code,
            recoverable: false,
            action: Some(action),
            sensitive: false,
            level: LogLevel::Debug,
        }
    }
}

impl AppError {
    fn presentation(&self) -> Presentation {
        match self {
            AppError::Database(_) => Presentation::server("DATABASE_ERROR"),
            AppError::Storage(_) => Presentation::server("STORAGE_ERROR"),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                Presentation::server("INTERNAL_ERROR")
            }
            AppError::Persistence { .. } => Presentation {
                action: Some("Retry the upload; already stored files are overwritten"),
                sensitive: false,
                ..Presentation::server("PERSISTENCE_ERROR")
            },
            AppError::ArchiveExtraction(_) => Presentation {
                level: LogLevel::Warn,
                ..Presentation::client(
                    400,
                    "ARCHIVE_EXTRACTION_ERROR",
                    "Check that the upload is a valid ZIP archive",
                )
            },
            AppError::Cancelled => Presentation {
                recoverable: true,
                level: LogLevel::Warn,
                ..Presentation::client(499, "CANCELLED", "Start the upload again")
            },
            AppError::InvalidInput(_) => {
                Presentation::client(400, "INVALID_INPUT", "Check request parameters and try again")
            }
            AppError::BadRequest(_) => {
                Presentation::client(400, "BAD_REQUEST", "Check request format and parameters")
            }
            AppError::NotFound(_) => {
                Presentation::client(404, "NOT_FOUND", "Verify the resource exists")
            }
            AppError::PayloadTooLarge(_) => Presentation::client(
                413,
                "PAYLOAD_TOO_LARGE",
                "Split the archive into smaller parts",
            ),
        }
    }

    /// Variant name, reported as `errorType` outside production.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::ArchiveExtraction(_) => "ArchiveExtraction",
            AppError::Persistence { .. } => "Persistence",
            AppError::Cancelled => "Cancelled",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by up to five `Caused by:` lines from the source chain.
    pub fn detailed_message(&self) -> String {
        const MAX_DEPTH: usize = 5;

        let mut chain = std::iter::successors(std::error::Error::source(self), |e| e.source());
        let mut details = self.to_string();
        for cause in chain.by_ref().take(MAX_DEPTH) {
            details.push_str(&format!("\n  Caused by: {}", cause));
        }
        if chain.next().is_some() {
            details.push_str("\n  ... (truncated)");
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.presentation().status
    }

    fn error_code(&self) -> &'static str {
        self.presentation().code
    }

    fn is_recoverable(&self) -> bool {
        self.presentation().recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.presentation().action
    }

    fn is_sensitive(&self) -> bool {
        self.presentation().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.presentation().level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::ArchiveExtraction(msg) => format!("Could not read archive: {}", msg),
            AppError::Persistence { message, committed } => format!(
                "Saving images failed after {} rows were recorded: {}",
                committed, message
            ),
            AppError::Cancelled => "Upload was cancelled".to_string(),
            AppError::InvalidInput(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_archive_extraction() {
        let err = AppError::ArchiveExtraction("invalid Zip archive".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "ARCHIVE_EXTRACTION_ERROR");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("invalid Zip archive"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_persistence_mentions_committed_rows() {
        let err = AppError::Persistence {
            message: "payload too large".to_string(),
            committed: 2000,
        };
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "PERSISTENCE_ERROR");
        assert!(err.client_message().contains("2000"));
        assert!(err.client_message().contains("payload too large"));
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk full").context("writing manifest"));
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("Caused by: writing manifest"));
    }
}
