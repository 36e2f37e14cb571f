//! # destiny-rs
//!
//! Daily-limited "destiny match" service: a per-user quota, a weighted
//! compatibility score, day-bucketed image storage and the HTTP API that
//! ties them together.
//!
//! ## Crates
//!
//! - [`destiny_core`] - Defaults, calendar-day helpers and the clock
//! - [`destiny_config`] - Configuration loading and validation
//! - [`destiny_usage`] - Per-user daily usage limiter
//! - [`destiny_score`] - Weighted score generator and labels
//! - [`destiny_images`] - Day-bucketed image storage and cleanup
//! - [`destiny_metrics`] - Prometheus-compatible metrics
//! - [`destiny_server`] - HTTP service

pub use destiny_config as config;
pub use destiny_core as core;
pub use destiny_images as images;
pub use destiny_metrics as metrics;
pub use destiny_score as score;
pub use destiny_server as server;
pub use destiny_usage as usage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use destiny_config::{Config, load_config, validate_config};
    pub use destiny_core::{Clock, FixedClock, SystemClock};
    pub use destiny_images::{ImageStore, StoredImage};
    pub use destiny_score::{MatchLabel, ScoreGenerator, label_for};
    pub use destiny_server::{AppState, CancellationToken, ServerError, run_with_shutdown};
    pub use destiny_usage::{LimiterConfig, UsageDecision, UsageLimiter};
}
