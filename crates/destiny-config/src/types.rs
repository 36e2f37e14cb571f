//! Configuration type definitions for the HTTP server, usage quotas, image
//! storage, maintenance, metrics, and logging.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Largest accepted request body, uploads included.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Timeout for each AI provider call.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    /// Time allowed for in-flight requests to finish on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub client_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_body_bytes: default_max_body_bytes(),
            provider_timeout_secs: default_provider_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            client_origins: Vec::new(),
        }
    }
}

/// Daily quota settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Directory holding one `<user>.json` record per user.
    #[serde(default = "default_usage_dir")]
    pub dir: String,
    /// Analysis requests allowed per user per day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Behavior on unreadable records: open or closed.
    #[serde(default = "default_read_failure")]
    pub read_failure: String,
    /// Concurrency mode: relaxed or strict.
    #[serde(default = "default_enforcement")]
    pub enforcement: String,
    /// Offset from UTC, in hours, of the calendar day used for resets and
    /// image buckets.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i8,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            dir: default_usage_dir(),
            daily_limit: default_daily_limit(),
            read_failure: default_read_failure(),
            enforcement: default_enforcement(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

/// Image storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Directory holding one sub-directory per day.
    #[serde(default = "default_images_root")]
    pub root: String,
    /// Public URL prefix images are served under.
    #[serde(default = "default_images_url_prefix")]
    pub url_prefix: String,
    /// Day buckets older than this are deleted by cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            root: default_images_root(),
            url_prefix: default_images_url_prefix(),
            retention_days: default_retention_days(),
        }
    }
}

/// Background cleanup schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_maintenance_enabled")]
    pub enabled: bool,
    /// How often to check for a calendar-day change.
    #[serde(default = "default_maintenance_check_secs")]
    pub check_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_maintenance_enabled(),
            check_interval_secs: default_maintenance_check_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// Prometheus exporter listen address. Metrics are disabled when unset.
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"destiny_usage": "debug", "tower_http": "warn"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
