// crates/core/src/calendar.rs
//! Calendar arithmetic in the service time zone.
//!
//! Persisted timestamps are Unix seconds; analytics bucket them into
//! calendar days using a single fixed offset configured for the whole
//! service. The offset is applied at query time only, so stored data is
//! zone-independent.

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc, Weekday};

/// Seconds in one calendar day.
pub const SECS_PER_DAY: i64 = 86_400;

/// Widest offset chrono accepts, in minutes (UTC±14:00).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Build the service zone from an offset in minutes east of UTC.
///
/// Out-of-range values are clamped to ±14 hours; `0` is UTC.
pub fn service_offset(minutes: i32) -> FixedOffset {
    let clamped = minutes.clamp(-MAX_OFFSET_MINUTES, MAX_OFFSET_MINUTES);
    // In range after the clamp, so the constructor cannot fail.
    FixedOffset::east_opt(clamped * 60).unwrap()
}

/// Calendar date of a Unix timestamp in the given zone.
pub fn local_date(ts: i64, tz: &FixedOffset) -> NaiveDate {
    tz.timestamp_opt(ts, 0).unwrap().date_naive()
}

/// Unix timestamp of local midnight on the day containing `ts`.
pub fn day_start(ts: i64, tz: &FixedOffset) -> i64 {
    local_date(ts, tz)
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_local_timezone(*tz)
        .unwrap()
        .timestamp()
}

/// Weekday of a Unix timestamp in the given zone.
pub fn local_weekday(ts: i64, tz: &FixedOffset) -> Weekday {
    use chrono::Datelike;
    local_date(ts, tz).weekday()
}

/// Current Unix time in seconds.
pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}
