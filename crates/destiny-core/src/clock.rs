//! Clock abstraction for calendar-day decisions.

use std::fmt;

use parking_lot::Mutex;
use time::{Date, OffsetDateTime, UtcOffset};

/// Source of the current time in the service's reference time zone.
///
/// Quota resets and image buckets both key off [`today`](Clock::today), so
/// tests substitute a [`FixedClock`] to exercise day rollover.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant in the reference offset.
    fn now(&self) -> OffsetDateTime;

    /// Current calendar day in the reference offset.
    #[inline]
    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Wall clock pinned to a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// Clock reporting days in UTC.
    #[inline]
    pub fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }

    /// Clock reporting days at the given offset.
    #[inline]
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Clock reporting days at a whole-hour offset from UTC.
    pub fn from_offset_hours(hours: i8) -> Result<Self, time::error::ComponentRange> {
        Ok(Self {
            offset: UtcOffset::from_hms(hours, 0, 0)?,
        })
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Manually driven clock for tests and one-shot maintenance runs.
pub struct FixedClock {
    now: Mutex<OffsetDateTime>,
}

impl FixedClock {
    /// Create a clock frozen at midnight UTC of `date`.
    pub fn new(date: Date) -> Self {
        Self {
            now: Mutex::new(date.midnight().assume_utc()),
        }
    }

    /// Move the clock to midnight of another day.
    pub fn set_today(&self, date: Date) {
        *self.now.lock() = date.midnight().assume_utc();
    }

    /// Advance the clock by whole days.
    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock();
        *now += time::Duration::days(days);
    }
}

impl fmt::Debug for FixedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedClock")
            .field("now", &*self.now.lock())
            .finish()
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}
