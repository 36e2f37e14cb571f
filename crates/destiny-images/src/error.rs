//! Image store error types.

use std::io;

/// Image storage error.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Underlying blob storage failed.
    #[error("image storage error: {0}")]
    Storage(#[from] io::Error),

    /// The payload could not be decoded into image bytes.
    #[error("invalid image payload: {0}")]
    InvalidPayload(String),
}

impl ImageError {
    /// Create an invalid payload error from any error type.
    #[inline]
    pub fn invalid<E: std::fmt::Display>(err: E) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
