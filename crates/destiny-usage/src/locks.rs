//! Per-key async locks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async mutex per key.
#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    /// Wait for exclusive access to `key`.
    pub(crate) async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self.inner.lock().entry(key.to_owned()).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop `key`'s entry if nobody is holding or waiting on it.
    pub(crate) fn release(&self, key: &str) {
        let mut map = self.inner.lock();
        if map.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(key);
        }
    }

    /// Drop entries nobody is holding or waiting on.
    pub(crate) fn prune(&self) {
        self.inner.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
