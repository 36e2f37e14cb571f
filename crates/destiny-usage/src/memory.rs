//! In-memory usage store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::UsageError;
use crate::record::UsageRecord;
use crate::traits::UsageStore;

/// Usage store backed by a hash map.
///
/// Records do not survive a restart. Suitable for tests and single-process
/// deployments that accept quota resets on redeploy.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    records: RwLock<HashMap<String, UsageRecord>>,
}

impl MemoryUsageStore {
    /// Create an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `(key, record)` pairs.
    pub fn from_records<I, K>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, UsageRecord)>,
        K: Into<String>,
    {
        let records = records.into_iter().map(|(k, r)| (k.into(), r)).collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Number of stored records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Snapshot of the record for `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<UsageRecord> {
        self.records.read().get(key).cloned()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn load(&self, key: &str) -> Result<Option<UsageRecord>, UsageError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, record: &UsageRecord) -> Result<(), UsageError> {
        self.records.write().insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, UsageError> {
        Ok(self.records.write().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, UsageError> {
        Ok(self.records.read().keys().cloned().collect())
    }
}
