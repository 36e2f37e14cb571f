//! File-backed usage store: one JSON file per user id.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::UsageError;
use crate::record::UsageRecord;
use crate::sanitize::is_safe_key;
use crate::traits::UsageStore;

const RECORD_EXT: &str = "json";
const TMP_EXT: &str = "tmp";

/// Sequence for temp file names, unique within the process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Usage store that keeps `<dir>/<user_id>.json` per user.
///
/// The directory is created on the first write. Records are written to a
/// temp file and renamed into place, so readers never see a partial record.
/// Keys must already be
/// sanitized; anything else is rejected with [`UsageError::InvalidKey`]
/// before touching the filesystem.
#[derive(Debug, Clone)]
pub struct FileUsageStore {
    dir: PathBuf,
}

impl FileUsageStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the record files.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, UsageError> {
        if !is_safe_key(key) {
            return Err(UsageError::InvalidKey);
        }
        Ok(self.dir.join(format!("{key}.{RECORD_EXT}")))
    }
}

#[async_trait]
impl UsageStore for FileUsageStore {
    async fn load(&self, key: &str) -> Result<Option<UsageRecord>, UsageError> {
        let path = self.path_for(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(UsageError::read(e)),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| UsageError::Corrupt(format!("{}: {e}", path.display())))
    }

    async fn save(&self, key: &str, record: &UsageRecord) -> Result<(), UsageError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(UsageError::write)?;
        let data = serde_json::to_vec_pretty(record).map_err(UsageError::write)?;

        // Concurrent writers of one key each get their own temp file.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!(".{key}.{}.{seq}.{TMP_EXT}", std::process::id()));
        tokio::fs::write(&tmp, data)
            .await
            .map_err(UsageError::write)?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(UsageError::write(e));
        }
        debug!(key, count = record.count, date = %record.date, "usage record written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, UsageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(UsageError::write(e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, UsageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(UsageError::read(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(UsageError::read)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && is_safe_key(stem)
            {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}
