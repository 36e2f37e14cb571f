//! Configuration validation logic.

use crate::Config;
use crate::defaults::max_utc_offset_hours;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.listen.trim().is_empty() {
        return Err(ConfigError::Validation("server.listen is empty".into()));
    }
    if config.server.max_body_bytes == 0 {
        return Err(ConfigError::Validation(
            "server.max_body_bytes must be > 0".into(),
        ));
    }
    if config.server.provider_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "server.provider_timeout_secs must be > 0".into(),
        ));
    }
    if config.server.shutdown_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "server.shutdown_timeout_secs must be > 0".into(),
        ));
    }
    if config.server.client_origins.iter().any(|o| o.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "server.client_origins contains an empty origin".into(),
        ));
    }

    if config.usage.dir.trim().is_empty() {
        return Err(ConfigError::Validation("usage.dir is empty".into()));
    }
    if config.usage.daily_limit == 0 {
        return Err(ConfigError::Validation(
            "usage.daily_limit must be > 0".into(),
        ));
    }
    let read_failure = ["open", "closed"];
    if !read_failure.contains(&config.usage.read_failure.as_str()) {
        return Err(ConfigError::Validation(format!(
            "usage.read_failure must be one of: {:?}",
            read_failure
        )));
    }
    let enforcement = ["relaxed", "strict"];
    if !enforcement.contains(&config.usage.enforcement.as_str()) {
        return Err(ConfigError::Validation(format!(
            "usage.enforcement must be one of: {:?}",
            enforcement
        )));
    }
    let max_offset = max_utc_offset_hours();
    if !(-max_offset..=max_offset).contains(&config.usage.utc_offset_hours) {
        return Err(ConfigError::Validation(format!(
            "usage.utc_offset_hours must be within -{max_offset}..={max_offset}"
        )));
    }

    if config.images.root.trim().is_empty() {
        return Err(ConfigError::Validation("images.root is empty".into()));
    }
    let prefix = config.images.url_prefix.trim_end_matches('/');
    if !prefix.starts_with('/') || prefix.len() < 2 {
        return Err(ConfigError::Validation(
            "images.url_prefix must be an absolute path such as /images".into(),
        ));
    }
    if prefix.starts_with("/api") {
        return Err(ConfigError::Validation(
            "images.url_prefix must not live under /api".into(),
        ));
    }

    if config.maintenance.check_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "maintenance.check_interval_secs must be > 0".into(),
        ));
    }

    if let Some(ref listen) = config.metrics.listen
        && listen.trim().is_empty()
    {
        return Err(ConfigError::Validation("metrics.listen is empty".into()));
    }

    if let Some(ref format) = config.logging.format {
        let formats = ["json", "pretty", "compact"];
        if !formats.contains(&format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.format must be one of: {:?}",
                formats
            )));
        }
    }
    if let Some(ref output) = config.logging.output {
        let outputs = ["stdout", "stderr"];
        if !outputs.contains(&output.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.output must be one of: {:?}",
                outputs
            )));
        }
    }
    Ok(())
}
