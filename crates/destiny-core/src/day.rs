//! Calendar-day strings (`YYYY-MM-DD`).
//!
//! Usage quotas reset and image buckets partition on the same day string.
//! ISO day strings sort chronologically, so bucket names can be compared
//! lexicographically against a cutoff.

use time::Date;
use time::macros::format_description;

/// Error returned when a string is not a valid `YYYY-MM-DD` day.
pub type DayParseError = time::error::Parse;

/// Format a date as `YYYY-MM-DD`.
pub fn format_day(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parse a `YYYY-MM-DD` string into a date.
pub fn parse_day(s: &str) -> Result<Date, DayParseError> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
}

/// Check whether `s` is exactly a valid `YYYY-MM-DD` day.
pub fn is_day_string(s: &str) -> bool {
    s.len() == 10
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() })
        && parse_day(s).is_ok()
}

/// The day `days` calendar days before `date`, saturating at the earliest
/// representable date.
pub fn days_before(date: Date, days: u32) -> Date {
    date.checked_sub(time::Duration::days(i64::from(days)))
        .unwrap_or(Date::MIN)
}
