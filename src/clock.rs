/// Wall-clock access for timestamps and local-time fields
use chrono::{DateTime, Datelike, FixedOffset, Timelike};

pub const MS_PER_DAY: f64 = 86_400_000.0;

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> f64;
    /// Offset of local time from UTC at `at_ms`, in minutes east.
    fn utc_offset_minutes(&self, at_ms: f64) -> i32;
}

/// Day of week (0 = Sunday) and hour of day of `at_ms` in local time.
pub fn local_day_and_hour(clock: &dyn Clock, at_ms: f64) -> (u8, u8) {
    let local = FixedOffset::east_opt(clock.utc_offset_minutes(at_ms) * 60)
        .zip(DateTime::from_timestamp_millis(at_ms as i64))
        .map(|(offset, utc)| utc.with_timezone(&offset));

    match local {
        Some(dt) => (dt.weekday().num_days_from_sunday() as u8, dt.hour() as u8),
        None => (0, 0),
    }
}
