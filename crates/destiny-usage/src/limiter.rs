//! Daily per-user quota.

use std::sync::Arc;

use destiny_core::{Clock, SystemClock, format_day};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Enforcement, LimiterConfig, ReadFailurePolicy};
use crate::error::UsageError;
use crate::locks::KeyLocks;
use crate::record::UsageRecord;
use crate::sanitize::is_safe_key;
use crate::traits::UsageStore;

/// Outcome of [`UsageLimiter::check_and_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests left today after this one (0 on denial).
    pub remaining: u32,
}

impl UsageDecision {
    #[inline]
    fn allowed(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
        }
    }

    #[inline]
    fn denied() -> Self {
        Self {
            allowed: false,
            remaining: 0,
        }
    }
}

/// Counters from a [`UsageLimiter::sweep_expired`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys examined.
    pub scanned: usize,
    /// Stale records deleted.
    pub removed: usize,
    /// Records left in place because they could not be read or removed.
    pub skipped: usize,
}

/// Enforces "at most `daily_limit` requests per user per calendar day".
///
/// Wraps any [`UsageStore`]. Records from a previous day count as absent, so
/// the quota resets at the day boundary of the limiter's [`Clock`] without
/// any background job.
///
/// # Example
/// ```
/// use destiny_usage::{LimiterConfig, MemoryUsageStore, UsageLimiter};
///
/// # async fn example() -> Result<(), destiny_usage::UsageError> {
/// let limiter = UsageLimiter::new(MemoryUsageStore::new(), LimiterConfig::with_limit(3));
/// let decision = limiter.check_and_consume("user-1").await?;
/// assert!(decision.allowed);
/// assert_eq!(decision.remaining, 2);
/// # Ok(())
/// # }
/// ```
pub struct UsageLimiter<S: UsageStore> {
    store: S,
    clock: Arc<dyn Clock>,
    config: LimiterConfig,
    locks: KeyLocks,
}

impl<S: UsageStore> UsageLimiter<S> {
    /// Create a limiter that uses UTC calendar days.
    pub fn new(store: S, config: LimiterConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock::utc()),
            config,
            locks: KeyLocks::default(),
        }
    }

    /// Replace the clock that decides what "today" is.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configured daily limit.
    #[inline]
    pub fn daily_limit(&self) -> u32 {
        self.config.daily_limit
    }

    /// Calendar day the limiter is currently counting.
    #[inline]
    pub fn today(&self) -> String {
        format_day(self.clock.today())
    }

    /// Access the underlying store.
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume one request from `user_id`'s quota for today.
    ///
    /// `user_id` must already be sanitized (see
    /// [`sanitize_user_id`](crate::sanitize_user_id)); anything else fails
    /// with [`UsageError::InvalidKey`]. Denials do not mutate state. Write
    /// failures propagate so the caller never treats an unrecorded request
    /// as gated.
    pub async fn check_and_consume(&self, user_id: &str) -> Result<UsageDecision, UsageError> {
        if !is_safe_key(user_id) {
            return Err(UsageError::InvalidKey);
        }

        match self.config.enforcement {
            Enforcement::Relaxed => self.consume(user_id).await,
            Enforcement::Strict => {
                let guard = self.locks.lock(user_id).await;
                let result = self.consume(user_id).await;
                drop(guard);
                self.locks.release(user_id);
                result
            }
        }
    }

    async fn consume(&self, user_id: &str) -> Result<UsageDecision, UsageError> {
        let today = self.today();
        let limit = self.config.daily_limit;

        let current = match self.store.load(user_id).await {
            Ok(record) => record.filter(|r| r.is_current(&today)),
            Err(e) if e.is_read_failure() => match self.config.read_failure {
                ReadFailurePolicy::Open => {
                    warn!(user_id, error = %e, "usage record unreadable, treating as absent");
                    None
                }
                ReadFailurePolicy::Closed => {
                    warn!(user_id, error = %e, "usage record unreadable, denying request");
                    return Ok(UsageDecision::denied());
                }
            },
            Err(e) => return Err(e),
        };

        let decision = match current {
            None => {
                self.store.save(user_id, &UsageRecord::first(&today)).await?;
                UsageDecision::allowed(limit.saturating_sub(1))
            }
            Some(record) if record.count >= limit => {
                info!(user_id, count = record.count, limit, "daily quota exhausted");
                return Ok(UsageDecision::denied());
            }
            Some(mut record) => {
                record.count += 1;
                self.store.save(user_id, &record).await?;
                UsageDecision::allowed(limit.saturating_sub(record.count))
            }
        };

        debug!(user_id, remaining = decision.remaining, "usage consumed");
        Ok(decision)
    }

    /// Requests `user_id` has left today, without consuming one.
    pub async fn peek_remaining(&self, user_id: &str) -> Result<u32, UsageError> {
        if !is_safe_key(user_id) {
            return Err(UsageError::InvalidKey);
        }

        let today = self.today();
        let limit = self.config.daily_limit;

        match self.store.load(user_id).await {
            Ok(Some(record)) if record.is_current(&today) => {
                Ok(limit.saturating_sub(record.count))
            }
            Ok(_) => Ok(limit),
            Err(e) if e.is_read_failure() => {
                debug!(user_id, error = %e, "usage record unreadable during peek");
                Ok(match self.config.read_failure {
                    ReadFailurePolicy::Open => limit,
                    ReadFailurePolicy::Closed => 0,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Delete every record whose date is not today.
    ///
    /// Stale records are already ignored on read, so this only reclaims
    /// space. Each key is re-checked against the current day under its key
    /// lock, so a record written for today is never removed, even if the
    /// sweep crosses midnight. Unreadable records are left alone.
    pub async fn sweep_expired(&self) -> Result<SweepReport, UsageError> {
        let keys = self.store.keys().await?;
        let mut report = SweepReport::default();

        for key in keys {
            report.scanned += 1;
            let _guard = self.locks.lock(&key).await;
            let today = self.today();

            match self.store.load(&key).await {
                Ok(Some(record)) if !record.is_current(&today) => {
                    match self.store.remove(&key).await {
                        Ok(_) => report.removed += 1,
                        Err(e) => {
                            warn!(key, error = %e, "failed to remove stale usage record");
                            report.skipped += 1;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(key, error = %e, "skipping unreadable usage record");
                    report.skipped += 1;
                }
            }
        }

        self.locks.prune();
        if report.removed > 0 || report.skipped > 0 {
            info!(
                scanned = report.scanned,
                removed = report.removed,
                skipped = report.skipped,
                "usage sweep complete"
            );
        }
        Ok(report)
    }
}

impl<S: UsageStore> std::fmt::Debug for UsageLimiter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageLimiter")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
