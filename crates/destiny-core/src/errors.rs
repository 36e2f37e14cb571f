//! Error type constants for metrics and logging.
//!
//! These constants provide consistent error classification across all crates.

/// I/O error.
pub const ERROR_IO: &str = "io";
/// Usage record storage error.
pub const ERROR_USAGE_STORE: &str = "usage_store";
/// Image storage error.
pub const ERROR_IMAGE_STORE: &str = "image_store";
/// Invalid client request.
pub const ERROR_REQUEST: &str = "request";
/// AI provider error.
pub const ERROR_PROVIDER: &str = "provider";
/// Timeout error.
pub const ERROR_TIMEOUT: &str = "timeout";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
