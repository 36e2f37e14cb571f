//! Data-access trait for usage stores.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::UsageError;
use crate::record::UsageRecord;

/// Key-value persistence for [`UsageRecord`]s keyed by sanitized user id.
///
/// Implementations provide only data access. Day rollover, quota checks and
/// read-failure policy live in [`UsageLimiter`](crate::UsageLimiter).
///
/// Return `Ok(None)` when no record exists. A record that exists but cannot
/// be decoded should be reported as [`UsageError::Corrupt`].
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Load the record for `key`.
    async fn load(&self, key: &str) -> Result<Option<UsageRecord>, UsageError>;

    /// Create or overwrite the record for `key`.
    async fn save(&self, key: &str, record: &UsageRecord) -> Result<(), UsageError>;

    /// Delete the record for `key`. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, UsageError>;

    /// List every stored key.
    async fn keys(&self) -> Result<Vec<String>, UsageError>;
}

#[async_trait]
impl<S: UsageStore + ?Sized> UsageStore for Arc<S> {
    #[inline]
    async fn load(&self, key: &str) -> Result<Option<UsageRecord>, UsageError> {
        (**self).load(key).await
    }

    #[inline]
    async fn save(&self, key: &str, record: &UsageRecord) -> Result<(), UsageError> {
        (**self).save(key, record).await
    }

    #[inline]
    async fn remove(&self, key: &str) -> Result<bool, UsageError> {
        (**self).remove(key).await
    }

    #[inline]
    async fn keys(&self) -> Result<Vec<String>, UsageError> {
        (**self).keys().await
    }
}

#[async_trait]
impl<S: UsageStore + ?Sized> UsageStore for Box<S> {
    #[inline]
    async fn load(&self, key: &str) -> Result<Option<UsageRecord>, UsageError> {
        (**self).load(key).await
    }

    #[inline]
    async fn save(&self, key: &str, record: &UsageRecord) -> Result<(), UsageError> {
        (**self).save(key, record).await
    }

    #[inline]
    async fn remove(&self, key: &str) -> Result<bool, UsageError> {
        (**self).remove(key).await
    }

    #[inline]
    async fn keys(&self) -> Result<Vec<String>, UsageError> {
        (**self).keys().await
    }
}
