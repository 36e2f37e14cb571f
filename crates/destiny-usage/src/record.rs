//! Persisted usage record.

use serde::{Deserialize, Serialize};

/// Requests consumed by one user on one calendar day.
///
/// Serialized as `{"count": n, "date": "YYYY-MM-DD"}`. A record whose `date`
/// is not today is expired and must be treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Requests consumed so far on `date`.
    pub count: u32,
    /// Calendar day this count belongs to.
    pub date: String,
}

impl UsageRecord {
    /// First request of the day.
    #[inline]
    pub fn first(date: impl Into<String>) -> Self {
        Self {
            count: 1,
            date: date.into(),
        }
    }

    /// Whether this record counts toward `today`.
    #[inline]
    pub fn is_current(&self, today: &str) -> bool {
        self.date == today
    }
}
