//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Server Defaults
// ============================================================================

/// Default HTTP listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:3001";
/// Default maximum request body size (10 MiB, enough for a portrait upload).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
/// Default timeout for a single AI provider call in seconds.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;
/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Usage Quota Defaults
// ============================================================================

/// Default number of analysis requests allowed per user per day.
pub const DEFAULT_DAILY_LIMIT: u32 = 3;
/// Default directory for per-user usage records.
pub const DEFAULT_USAGE_DIR: &str = "data/usage";
/// Default offset (hours from UTC) of the calendar day used for quotas and buckets.
pub const DEFAULT_UTC_OFFSET_HOURS: i8 = 0;
/// Default behavior when a usage record cannot be read (`open` or `closed`).
pub const DEFAULT_READ_FAILURE_POLICY: &str = "open";
/// Default quota enforcement mode (`relaxed` or `strict`).
pub const DEFAULT_ENFORCEMENT: &str = "relaxed";
/// Largest accepted UTC offset in hours, either direction.
pub const MAX_UTC_OFFSET_HOURS: i8 = 14;

// ============================================================================
// Image Store Defaults
// ============================================================================

/// Default root directory for stored images.
pub const DEFAULT_IMAGES_ROOT: &str = "public/images";
/// Default public URL prefix for stored images.
pub const DEFAULT_IMAGES_URL_PREFIX: &str = "/images";
/// Default number of days generated images are retained.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

// ============================================================================
// Maintenance Defaults
// ============================================================================

/// Default maintenance enabled.
pub const DEFAULT_MAINTENANCE_ENABLED: bool = true;
/// Default interval between day-rollover checks in seconds.
pub const DEFAULT_MAINTENANCE_CHECK_SECS: u64 = 60;

// ============================================================================
// Score Defaults
// ============================================================================

/// Score returned when the weighted band walk fails to select a band.
pub const FALLBACK_SCORE: u8 = 85;
/// Lowest score the generator can produce.
pub const MIN_SCORE: u8 = 60;
/// Highest score the generator can produce.
pub const MAX_SCORE: u8 = 98;
