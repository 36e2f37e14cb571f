//! Image storage for destiny.
//!
//! Uploaded portraits and generated partner images are written into one
//! directory per calendar day and addressed by public URL paths of the form
//! `/images/<YYYY-MM-DD>/<uuid>.<ext>`. Old day buckets are removed in bulk
//! by [`ImageStore::cleanup`].
//!
//! Storage is pluggable through [`BlobStore`]; [`FsBlobStore`] writes to the
//! local filesystem and [`MemoryBlobStore`] keeps everything in memory.

mod blob;
mod error;
mod format;
mod locator;
mod store;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use error::ImageError;
pub use format::ImageFormat;
pub use store::{CleanupReport, ImageStore, StoredImage, decode_data_uri};
