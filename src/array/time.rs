//! Timestamp helpers.
//!
//! Instants are `i64` nanoseconds since the Unix epoch. Result keys use a fixed
//! nanosecond-precision rendering so that keys produced on different workers compare
//! equal as strings.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
pub const NANOS_PER_HOUR: i64 = 3_600 * NANOS_PER_SECOND;
pub const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;

const KEY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9f";
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn to_datetime(instant: i64) -> NaiveDateTime {
    DateTime::from_timestamp_nanos(instant).naive_utc()
}

pub fn from_datetime(datetime: NaiveDateTime) -> Result<i64> {
    datetime
        .and_utc()
        .timestamp_nanos_opt()
        .ok_or_else(|| anyhow!("Datetime {} is out of the nanosecond range", datetime))
}

/// Renders an instant as a result key (`YYYY-MM-DDTHH:MM:SS.fffffffff`).
pub fn format_key(instant: i64) -> String {
    to_datetime(instant).format(KEY_FORMAT).to_string()
}

/// Parses a result key back into an instant.
///
/// Accepts any fractional precision and plain `YYYY-MM-DD` dates.
pub fn parse_key(key: &str) -> Result<i64> {
    let datetime = match NaiveDateTime::parse_from_str(key, PARSE_FORMAT) {
        Ok(datetime) => datetime,
        Err(_) => NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .map_err(|e| anyhow!("Invalid timestamp '{}': {}", key, e))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("Invalid timestamp '{}'", key))?,
    };
    from_datetime(datetime)
}

pub fn hour_of(instant: i64) -> u32 {
    to_datetime(instant).hour()
}
