//! Bucketed blob storage backends.

use std::collections::BTreeMap;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

/// Two-level blob storage: named objects grouped into buckets.
///
/// Bucket and object names are single path segments. Missing buckets and
/// objects are reported as absent, never as errors.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` to `bucket/name`, creating the bucket if needed.
    async fn put(&self, bucket: &str, name: &str, data: Bytes) -> io::Result<()>;

    /// Read `bucket/name`.
    async fn get(&self, bucket: &str, name: &str) -> io::Result<Option<Bytes>>;

    /// Delete `bucket/name`. Returns whether it existed.
    async fn delete(&self, bucket: &str, name: &str) -> io::Result<bool>;

    /// Whether `bucket/name` exists.
    async fn exists(&self, bucket: &str, name: &str) -> io::Result<bool>;

    /// List bucket names.
    async fn buckets(&self) -> io::Result<Vec<String>>;

    /// Delete a bucket and everything in it. Returns the number of objects removed.
    async fn remove_bucket(&self, bucket: &str) -> io::Result<usize>;
}

#[async_trait]
impl<B: BlobStore + ?Sized> BlobStore for Arc<B> {
    #[inline]
    async fn put(&self, bucket: &str, name: &str, data: Bytes) -> io::Result<()> {
        (**self).put(bucket, name, data).await
    }

    #[inline]
    async fn get(&self, bucket: &str, name: &str) -> io::Result<Option<Bytes>> {
        (**self).get(bucket, name).await
    }

    #[inline]
    async fn delete(&self, bucket: &str, name: &str) -> io::Result<bool> {
        (**self).delete(bucket, name).await
    }

    #[inline]
    async fn exists(&self, bucket: &str, name: &str) -> io::Result<bool> {
        (**self).exists(bucket, name).await
    }

    #[inline]
    async fn buckets(&self) -> io::Result<Vec<String>> {
        (**self).buckets().await
    }

    #[inline]
    async fn remove_bucket(&self, bucket: &str) -> io::Result<usize> {
        (**self).remove_bucket(bucket).await
    }
}

#[async_trait]
impl<B: BlobStore + ?Sized> BlobStore for Box<B> {
    #[inline]
    async fn put(&self, bucket: &str, name: &str, data: Bytes) -> io::Result<()> {
        (**self).put(bucket, name, data).await
    }

    #[inline]
    async fn get(&self, bucket: &str, name: &str) -> io::Result<Option<Bytes>> {
        (**self).get(bucket, name).await
    }

    #[inline]
    async fn delete(&self, bucket: &str, name: &str) -> io::Result<bool> {
        (**self).delete(bucket, name).await
    }

    #[inline]
    async fn exists(&self, bucket: &str, name: &str) -> io::Result<bool> {
        (**self).exists(bucket, name).await
    }

    #[inline]
    async fn buckets(&self) -> io::Result<Vec<String>> {
        (**self).buckets().await
    }

    #[inline]
    async fn remove_bucket(&self, bucket: &str) -> io::Result<usize> {
        (**self).remove_bucket(bucket).await
    }
}

/// Whether `segment` is a single normal path component.
fn is_plain_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn invalid_segment(segment: &str) -> io::Error {
    io::Error::new(
        ErrorKind::InvalidInput,
        format!("invalid path segment: {segment:?}"),
    )
}

/// Sequence for temp file names, unique within the process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Blob store on the local filesystem: `<root>/<bucket>/<name>`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> io::Result<PathBuf> {
        if !is_plain_segment(bucket) {
            return Err(invalid_segment(bucket));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, name: &str) -> io::Result<PathBuf> {
        if !is_plain_segment(name) {
            return Err(invalid_segment(name));
        }
        Ok(self.bucket_path(bucket)?.join(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bucket: &str, name: &str, data: Bytes) -> io::Result<()> {
        let path = self.object_path(bucket, name)?;
        let dir = self.bucket_path(bucket)?;
        tokio::fs::create_dir_all(&dir).await?;

        // Write-then-rename so readers only ever see complete objects.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(".{name}.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&tmp, &data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        debug!(path = %path.display(), bytes = data.len(), "blob written");
        Ok(())
    }

    async fn get(&self, bucket: &str, name: &str) -> io::Result<Option<Bytes>> {
        let path = self.object_path(bucket, name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, bucket: &str, name: &str) -> io::Result<bool> {
        let path = self.object_path(bucket, name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, bucket: &str, name: &str) -> io::Result<bool> {
        let path = self.object_path(bucket, name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn buckets(&self) -> io::Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut buckets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                buckets.push(name);
            }
        }
        buckets.sort();
        Ok(buckets)
    }

    async fn remove_bucket(&self, bucket: &str) -> io::Result<usize> {
        let path = self.bucket_path(bucket)?;
        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut files = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files += 1;
            }
        }

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(files),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }
}

type Buckets = BTreeMap<String, BTreeMap<String, Bytes>>;

/// In-memory blob store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    buckets: RwLock<Buckets>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored objects.
    pub fn object_count(&self) -> usize {
        self.buckets.read().values().map(BTreeMap::len).sum()
    }

    fn check(bucket: &str, name: &str) -> io::Result<()> {
        for segment in [bucket, name] {
            if !is_plain_segment(segment) {
                return Err(invalid_segment(segment));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bucket: &str, name: &str, data: Bytes) -> io::Result<()> {
        Self::check(bucket, name)?;
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(name.to_string(), data);
        Ok(())
    }

    async fn get(&self, bucket: &str, name: &str) -> io::Result<Option<Bytes>> {
        Self::check(bucket, name)?;
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .and_then(|objects| objects.get(name))
            .cloned())
    }

    async fn delete(&self, bucket: &str, name: &str) -> io::Result<bool> {
        Self::check(bucket, name)?;
        Ok(self
            .buckets
            .write()
            .get_mut(bucket)
            .and_then(|objects| objects.remove(name))
            .is_some())
    }

    async fn exists(&self, bucket: &str, name: &str) -> io::Result<bool> {
        Self::check(bucket, name)?;
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(name)))
    }

    async fn buckets(&self) -> io::Result<Vec<String>> {
        Ok(self.buckets.read().keys().cloned().collect())
    }

    async fn remove_bucket(&self, bucket: &str) -> io::Result<usize> {
        Ok(self
            .buckets
            .write()
            .remove(bucket)
            .map_or(0, |objects| objects.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_segments() {
        assert!(is_plain_segment("2024-01-01"));
        assert!(is_plain_segment("a.jpg"));
        assert!(!is_plain_segment(""));
        assert!(!is_plain_segment("."));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("a/b"));
        assert!(!is_plain_segment("a\\b"));
        assert!(!is_plain_segment("/etc"));
        assert!(!is_plain_segment("a\0b"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fs_put_is_never_observed_half_written() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(FsBlobStore::new(tmp.path()));
        let small = Bytes::from(vec![1u8; 64 * 1024]);
        let large = Bytes::from(vec![2u8; 256 * 1024]);
        store.put("2024-01-01", "a.png", small.clone()).await.unwrap();

        let writer = {
            let store = store.clone();
            let (small, large) = (small.clone(), large.clone());
            tokio::spawn(async move {
                for i in 0..100 {
                    let data = if i % 2 == 0 { large.clone() } else { small.clone() };
                    store.put("2024-01-01", "a.png", data).await.unwrap();
                }
            })
        };

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let data = store.get("2024-01-01", "a.png").await.unwrap().unwrap();
                    assert!(data == small || data == large, "torn read of {} bytes", data.len());
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        let names: Vec<_> = std::fs::read_dir(tmp.path().join("2024-01-01"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.png"]);
    }

    #[tokio::test]
    async fn test_fs_store_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(tmp.path().join("images"));
        assert!(store.buckets().await.unwrap().is_empty());

        store
            .put("2024-01-01", "a.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert!(store.exists("2024-01-01", "a.png").await.unwrap());
        assert_eq!(
            store.get("2024-01-01", "a.png").await.unwrap().unwrap(),
            Bytes::from_static(b"png")
        );
        assert_eq!(store.buckets().await.unwrap(), vec!["2024-01-01"]);

        assert!(store.delete("2024-01-01", "a.png").await.unwrap());
        assert!(!store.delete("2024-01-01", "a.png").await.unwrap());
        assert!(store.get("2024-01-01", "a.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fs_store_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(tmp.path());
        let err = store
            .put("..", "x.png", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.get("2024-01-01", "../x").await.is_err());
    }

    #[tokio::test]
    async fn test_fs_remove_bucket_counts_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(tmp.path());
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            store
                .put("2024-01-01", name, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        assert_eq!(store.remove_bucket("2024-01-01").await.unwrap(), 3);
        assert_eq!(store.remove_bucket("2024-01-01").await.unwrap(), 0);
        assert!(!tmp.path().join("2024-01-01").exists());
    }

    #[tokio::test]
    async fn test_fs_buckets_ignore_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("stray.txt"), b"x").unwrap();
        std::fs::create_dir(tmp.path().join("2024-02-02")).unwrap();
        let store = FsBlobStore::new(tmp.path());
        assert_eq!(store.buckets().await.unwrap(), vec!["2024-02-02"]);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryBlobStore::new();
        store.put("b", "1", Bytes::from_static(b"1")).await.unwrap();
        store.put("b", "2", Bytes::from_static(b"2")).await.unwrap();
        store.put("c", "1", Bytes::from_static(b"3")).await.unwrap();
        assert_eq!(store.object_count(), 3);
        assert_eq!(store.buckets().await.unwrap(), vec!["b", "c"]);
        assert_eq!(store.remove_bucket("b").await.unwrap(), 2);
        assert!(!store.exists("b", "1").await.unwrap());
        assert!(store.exists("c", "1").await.unwrap());
        assert!(store.put("..", "1", Bytes::new()).await.is_err());
    }
}
