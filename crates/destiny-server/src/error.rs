//! Server error types.

use destiny_metrics::{ERROR_CONFIG, ERROR_IMAGE_STORE, ERROR_IO, ERROR_USAGE_STORE};
use destiny_usage::UsageError;

/// Server error type.
///
/// Request-level failures are answered with an [`crate::ApiError`]; this
/// type covers startup, serving and maintenance failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("usage: {0}")]
    Usage(#[from] UsageError),
    #[error("image cleanup incomplete: {0}")]
    Cleanup(String),
}

impl ServerError {
    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Io(_) => ERROR_IO,
            ServerError::Config(_) => ERROR_CONFIG,
            ServerError::Usage(_) => ERROR_USAGE_STORE,
            ServerError::Cleanup(_) => ERROR_IMAGE_STORE,
        }
    }
}
