//! Date-bucketed image store.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use destiny_core::defaults::DEFAULT_IMAGES_URL_PREFIX;
use destiny_core::{Clock, SystemClock, days_before, format_day, is_day_string};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::blob::{BlobStore, FsBlobStore};
use crate::error::ImageError;
use crate::format::ImageFormat;
use crate::locator::{Locator, parse_locator};

/// Handle to a saved image.
///
/// The public URL is derived from these fields; nothing else is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    /// Random identifier, also the file stem.
    pub id: Uuid,
    /// Day bucket the image was written to.
    pub bucket_date: String,
    /// Stored format.
    pub format: ImageFormat,
}

impl StoredImage {
    /// File name inside the bucket.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.format.extension())
    }

    /// Public path under the default `/images` prefix.
    pub fn url_path(&self) -> String {
        self.url_with_prefix(DEFAULT_IMAGES_URL_PREFIX)
    }

    /// Public path under `prefix`.
    pub fn url_with_prefix(&self, prefix: &str) -> String {
        format!(
            "{}/{}/{}",
            prefix.trim_end_matches('/'),
            self.bucket_date,
            self.file_name()
        )
    }
}

/// Result of an [`ImageStore::cleanup`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Day buckets deleted.
    pub buckets_removed: usize,
    /// Files inside the deleted buckets.
    pub files_removed: usize,
    /// Buckets that should have been deleted but could not be.
    pub failed: Vec<String>,
    /// Set when the bucket listing itself failed.
    pub scan_error: Option<String>,
}

impl CleanupReport {
    /// Whether every expired bucket was removed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.scan_error.is_none()
    }
}

/// Persists images into one bucket per calendar day.
///
/// Images are written to `<bucket>/<uuid>.<ext>` and addressed publicly as
/// `<url_prefix>/<bucket>/<uuid>.<ext>`. Lookups accept only paths that
/// resolve to exactly one object under the prefix; anything else is treated
/// as missing.
///
/// # Example
/// ```
/// use destiny_images::{ImageStore, MemoryBlobStore};
///
/// # async fn example() -> Result<(), destiny_images::ImageError> {
/// let store = ImageStore::new(MemoryBlobStore::new());
/// let image = store.save(vec![0x89, b'P', b'N', b'G'], None).await?;
/// assert!(store.exists(&image.url_path()).await?);
/// # Ok(())
/// # }
/// ```
pub struct ImageStore<B: BlobStore> {
    blobs: B,
    clock: Arc<dyn Clock>,
    url_prefix: String,
}

impl ImageStore<FsBlobStore> {
    /// Store images on disk under `root`.
    pub fn open(root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(FsBlobStore::new(root))
    }
}

impl<B: BlobStore> ImageStore<B> {
    /// Create a store over `blobs` using UTC days and the `/images` prefix.
    pub fn new(blobs: B) -> Self {
        Self {
            blobs,
            clock: Arc::new(SystemClock::utc()),
            url_prefix: DEFAULT_IMAGES_URL_PREFIX.to_string(),
        }
    }

    /// Replace the clock that picks buckets and cleanup cutoffs.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the public URL prefix.
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.url_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Public URL prefix, without a trailing slash.
    #[inline]
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Access the underlying blob store.
    #[inline]
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Public URL of `image` under this store's prefix.
    pub fn url_for(&self, image: &StoredImage) -> String {
        image.url_with_prefix(&self.url_prefix)
    }

    /// Save raw image bytes into today's bucket.
    ///
    /// The format comes from `content_type_hint` when it names a known image
    /// MIME type, otherwise from the magic bytes, otherwise PNG.
    ///
    /// Empty `data` is rejected with [`ImageError::InvalidPayload`] before
    /// anything is written; every other failure is [`ImageError::Storage`].
    pub async fn save(
        &self,
        data: impl Into<Bytes>,
        content_type_hint: Option<&str>,
    ) -> Result<StoredImage, ImageError> {
        let data = data.into();
        if data.is_empty() {
            return Err(ImageError::InvalidPayload("empty image".to_string()));
        }

        let image = StoredImage {
            id: Uuid::new_v4(),
            bucket_date: format_day(self.clock.today()),
            format: ImageFormat::detect(content_type_hint, &data),
        };
        let size = data.len();
        self.blobs
            .put(&image.bucket_date, &image.file_name(), data)
            .await?;

        info!(
            id = %image.id,
            bucket = %image.bucket_date,
            format = %image.format,
            bytes = size,
            "image saved"
        );
        Ok(image)
    }

    /// Save a `data:<mime>;base64,<payload>` URI or bare base64 string.
    pub async fn save_data_uri(&self, uri: &str) -> Result<StoredImage, ImageError> {
        let (data, format) = decode_data_uri(uri)?;
        self.save(data, Some(format.mime())).await
    }

    /// Read the image at `url_path`. Unknown or rejected paths yield `None`.
    pub async fn read(&self, url_path: &str) -> Result<Option<(Bytes, ImageFormat)>, ImageError> {
        let Some(loc) = self.locate(url_path) else {
            return Ok(None);
        };
        let Some(data) = self.blobs.get(&loc.bucket, &loc.file).await? else {
            return Ok(None);
        };
        let format = loc
            .extension()
            .and_then(ImageFormat::from_extension)
            .unwrap_or_else(|| ImageFormat::detect(None, &data));
        Ok(Some((data, format)))
    }

    /// Delete the image at `url_path`. Returns whether a file was removed.
    pub async fn delete(&self, url_path: &str) -> Result<bool, ImageError> {
        let Some(loc) = self.locate(url_path) else {
            return Ok(false);
        };
        let removed = self.blobs.delete(&loc.bucket, &loc.file).await?;
        if removed {
            info!(bucket = %loc.bucket, file = %loc.file, "image deleted");
        }
        Ok(removed)
    }

    /// Whether an image exists at `url_path`.
    pub async fn exists(&self, url_path: &str) -> Result<bool, ImageError> {
        let Some(loc) = self.locate(url_path) else {
            return Ok(false);
        };
        Ok(self.blobs.exists(&loc.bucket, &loc.file).await?)
    }

    /// Remove every day bucket older than `days_to_keep` days.
    ///
    /// A bucket is removed when its day sorts strictly before
    /// `today - days_to_keep`, so today's bucket always survives. Entries
    /// that are not `YYYY-MM-DD` are left alone. A bucket that fails to
    /// delete is recorded in the report and the pass continues.
    pub async fn cleanup(&self, days_to_keep: u32) -> CleanupReport {
        let cutoff = format_day(days_before(self.clock.today(), days_to_keep));
        let mut report = CleanupReport::default();

        let buckets = match self.blobs.buckets().await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(error = %e, "failed to list image buckets");
                report.scan_error = Some(e.to_string());
                return report;
            }
        };

        for bucket in buckets {
            if !is_day_string(&bucket) || bucket.as_str() >= cutoff.as_str() {
                continue;
            }
            match self.blobs.remove_bucket(&bucket).await {
                Ok(files) => {
                    debug!(bucket = %bucket, files, "image bucket removed");
                    report.buckets_removed += 1;
                    report.files_removed += files;
                }
                Err(e) => {
                    warn!(bucket = %bucket, error = %e, "failed to remove image bucket");
                    report.failed.push(bucket);
                }
            }
        }

        info!(
            cutoff = %cutoff,
            buckets = report.buckets_removed,
            files = report.files_removed,
            failed = report.failed.len(),
            "image cleanup finished"
        );
        report
    }

    fn locate(&self, url_path: &str) -> Option<Locator> {
        match parse_locator(&self.url_prefix, url_path) {
            Ok(loc) => Some(loc),
            Err(reason) => {
                debug!(url_path, ?reason, "image path rejected");
                None
            }
        }
    }
}

/// Decode a `data:<mime>;base64,<payload>` URI or bare base64 string.
///
/// The format follows the embedded MIME type when it names a known image
/// type, otherwise the decoded magic bytes.
pub fn decode_data_uri(uri: &str) -> Result<(Bytes, ImageFormat), ImageError> {
    let (mime, payload) = split_data_uri(uri)?;
    let data = STANDARD
        .decode(payload.trim())
        .map_err(ImageError::invalid)?;
    if data.is_empty() {
        return Err(ImageError::InvalidPayload("empty image".to_string()));
    }
    let format = ImageFormat::detect(mime, &data);
    Ok((Bytes::from(data), format))
}

/// Split a data URI into its MIME type and base64 payload.
///
/// Input without a `data:` scheme is taken as bare base64.
fn split_data_uri(uri: &str) -> Result<(Option<&str>, &str), ImageError> {
    let uri = uri.trim();
    let Some(rest) = uri.strip_prefix("data:") else {
        return Ok((None, uri));
    };
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::InvalidPayload("data URI has no payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ImageError::InvalidPayload("data URI is not base64".to_string()))?;
    if !mime.is_empty() && !mime.to_ascii_lowercase().starts_with("image/") {
        return Err(ImageError::InvalidPayload(format!(
            "data URI is not an image: {mime}"
        )));
    }
    Ok(((!mime.is_empty()).then_some(mime), payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_data_uri() {
        assert_eq!(
            split_data_uri("data:image/png;base64,AAAA").unwrap(),
            (Some("image/png"), "AAAA")
        );
        assert_eq!(split_data_uri("AAAA").unwrap(), (None, "AAAA"));
        assert_eq!(
            split_data_uri("data:;base64,AAAA").unwrap(),
            (None, "AAAA")
        );
        assert!(split_data_uri("data:image/png,raw").is_err());
        assert!(split_data_uri("data:image/png;base64").is_err());
        assert!(split_data_uri("data:text/html;base64,AAAA").is_err());
    }

    #[test]
    fn test_decode_data_uri() {
        let (data, format) = decode_data_uri("data:image/gif;base64,R0lGODlh").unwrap();
        assert_eq!(&data[..], b"GIF89a");
        assert_eq!(format, ImageFormat::Gif);

        let (_, sniffed) = decode_data_uri("/9j/4AAQ").unwrap();
        assert_eq!(sniffed, ImageFormat::Jpeg);

        assert!(matches!(
            decode_data_uri("data:image/png;base64,"),
            Err(ImageError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_url_path() {
        let image = StoredImage {
            id: Uuid::nil(),
            bucket_date: "2024-05-06".to_string(),
            format: ImageFormat::Jpeg,
        };
        assert_eq!(
            image.url_path(),
            "/images/2024-05-06/00000000-0000-0000-0000-000000000000.jpg"
        );
        assert_eq!(
            image.url_with_prefix("/media/"),
            "/media/2024-05-06/00000000-0000-0000-0000-000000000000.jpg"
        );
    }
}
