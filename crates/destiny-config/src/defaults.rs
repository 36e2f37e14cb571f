//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `destiny_core::defaults`.

use destiny_core::defaults;

/// Generate default value functions that forward to destiny_core::defaults constants.
macro_rules! default_fns {
    // For Copy types (integers, bool, etc.)
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_max_body_bytes        => DEFAULT_MAX_BODY_BYTES: usize,
    default_provider_timeout_secs => DEFAULT_PROVIDER_TIMEOUT_SECS: u64,
    default_shutdown_timeout_secs => DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64,
    default_daily_limit           => DEFAULT_DAILY_LIMIT: u32,
    default_utc_offset_hours      => DEFAULT_UTC_OFFSET_HOURS: i8,
    max_utc_offset_hours          => MAX_UTC_OFFSET_HOURS: i8,
    default_retention_days        => DEFAULT_RETENTION_DAYS: u32,
    default_maintenance_enabled   => DEFAULT_MAINTENANCE_ENABLED: bool,
    default_maintenance_check_secs => DEFAULT_MAINTENANCE_CHECK_SECS: u64,
}

default_string_fns! {
    default_listen              => DEFAULT_LISTEN,
    default_usage_dir           => DEFAULT_USAGE_DIR,
    default_read_failure        => DEFAULT_READ_FAILURE_POLICY,
    default_enforcement         => DEFAULT_ENFORCEMENT,
    default_images_root         => DEFAULT_IMAGES_ROOT,
    default_images_url_prefix   => DEFAULT_IMAGES_URL_PREFIX,
}
