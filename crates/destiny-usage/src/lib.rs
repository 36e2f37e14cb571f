//! Daily usage quotas for destiny.
//!
//! This crate tracks how many analysis requests each user has made on the
//! current calendar day and gates requests once the quota is exhausted.
//!
//! # Example
//!
//! ```
//! use destiny_usage::{FileUsageStore, LimiterConfig, UsageLimiter, sanitize_user_id};
//!
//! # async fn example() -> Result<(), destiny_usage::UsageError> {
//! let limiter = UsageLimiter::new(FileUsageStore::new("data/usage"), LimiterConfig::default());
//!
//! let user = sanitize_user_id("user-42").ok_or(destiny_usage::UsageError::InvalidKey)?;
//! let decision = limiter.check_and_consume(&user).await?;
//! if !decision.allowed {
//!     // quota exhausted until tomorrow
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod file;
mod limiter;
mod locks;
mod memory;
mod record;
mod sanitize;
mod traits;

pub use config::{Enforcement, LimiterConfig, ParsePolicyError, ReadFailurePolicy};
pub use error::UsageError;
pub use file::FileUsageStore;
pub use limiter::{SweepReport, UsageDecision, UsageLimiter};
pub use memory::MemoryUsageStore;
pub use record::UsageRecord;
pub use sanitize::{is_safe_key, sanitize_user_id};
pub use traits::UsageStore;
