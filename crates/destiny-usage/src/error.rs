//! Usage tracking error types.

/// Usage tracking error.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    /// User id is empty or contains characters outside `[A-Za-z0-9-]`.
    #[error("invalid user id")]
    InvalidKey,

    /// The backing store could not be read.
    #[error("usage read failed: {0}")]
    Read(String),

    /// A stored record exists but could not be decoded.
    #[error("corrupt usage record: {0}")]
    Corrupt(String),

    /// The backing store could not be written.
    #[error("usage write failed: {0}")]
    Write(String),
}

impl UsageError {
    /// Create a read error from any error type.
    #[inline]
    pub fn read<E: std::fmt::Display>(err: E) -> Self {
        Self::Read(err.to_string())
    }

    /// Create a write error from any error type.
    #[inline]
    pub fn write<E: std::fmt::Display>(err: E) -> Self {
        Self::Write(err.to_string())
    }

    /// Whether this error came from reading (or decoding) a record.
    ///
    /// Read-side failures are subject to the limiter's
    /// [`ReadFailurePolicy`](crate::ReadFailurePolicy); write failures always
    /// propagate.
    #[inline]
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Corrupt(_))
    }
}
