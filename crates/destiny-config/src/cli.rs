//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override HTTP listen address, e.g. 0.0.0.0:3001
    #[arg(long)]
    pub listen: Option<String>,
    /// Override maximum request body size (bytes)
    #[arg(long)]
    pub max_body_bytes: Option<usize>,
    /// Override AI provider call timeout (seconds)
    #[arg(long)]
    pub provider_timeout_secs: Option<u64>,
    /// Override allowed CORS origins (repeatable or comma-separated)
    #[arg(long = "client-origin", num_args = 1.., value_delimiter = ',')]
    pub client_origins: Option<Vec<String>>,
    /// Override usage record directory
    #[arg(long)]
    pub usage_dir: Option<String>,
    /// Override daily analysis quota per user
    #[arg(long)]
    pub daily_limit: Option<u32>,
    /// Behavior on unreadable usage records (open, closed)
    #[arg(long)]
    pub read_failure: Option<String>,
    /// Quota enforcement mode (relaxed, strict)
    #[arg(long)]
    pub enforcement: Option<String>,
    /// Offset from UTC in hours for the calendar day
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset_hours: Option<i8>,
    /// Override image storage directory
    #[arg(long)]
    pub images_root: Option<String>,
    /// Override image retention (days)
    #[arg(long)]
    pub retention_days: Option<u32>,
    /// Enable or disable scheduled cleanup
    #[arg(long)]
    pub maintenance: Option<bool>,
    /// Override metrics listen address
    #[arg(long)]
    pub metrics_listen: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Override log format (json/pretty/compact)
    #[arg(long)]
    pub log_format: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.listen {
        config.server.listen = v.clone();
    }
    if let Some(v) = overrides.max_body_bytes {
        config.server.max_body_bytes = v;
    }
    if let Some(v) = overrides.provider_timeout_secs {
        config.server.provider_timeout_secs = v;
    }
    if let Some(v) = &overrides.client_origins {
        config.server.client_origins = v.clone();
    }
    // Usage quota
    if let Some(v) = &overrides.usage_dir {
        config.usage.dir = v.clone();
    }
    if let Some(v) = overrides.daily_limit {
        config.usage.daily_limit = v;
    }
    if let Some(v) = &overrides.read_failure {
        config.usage.read_failure = v.clone();
    }
    if let Some(v) = &overrides.enforcement {
        config.usage.enforcement = v.clone();
    }
    if let Some(v) = overrides.utc_offset_hours {
        config.usage.utc_offset_hours = v;
    }
    // Images
    if let Some(v) = &overrides.images_root {
        config.images.root = v.clone();
    }
    if let Some(v) = overrides.retention_days {
        config.images.retention_days = v;
    }
    if let Some(v) = overrides.maintenance {
        config.maintenance.enabled = v;
    }
    if let Some(v) = &overrides.metrics_listen {
        config.metrics.listen = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
    if let Some(v) = &overrides.log_format {
        config.logging.format = Some(v.clone());
    }
}
