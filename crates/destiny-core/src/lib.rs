//! Core types and constants shared across destiny crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Error type constants for metrics/logging
//! - Calendar-day helpers and the [`Clock`] abstraction
//! - Common project metadata

pub mod clock;
pub mod day;
pub mod defaults;
pub mod errors;

// Re-export commonly used items at crate root
pub use clock::{Clock, FixedClock, SystemClock};
pub use day::{DayParseError, days_before, format_day, is_day_string, parse_day};
pub use defaults::*;
pub use errors::*;

/// Project name.
pub const PROJECT_NAME: &str = "destiny-rs";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
