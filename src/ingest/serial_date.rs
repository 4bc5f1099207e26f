//! MATLAB serial date numbers.
//!
//! `Serial_Date` values count days since the proleptic year 0 (`datenum`), with
//! the fractional part as time of day. Stored readings keep the raw number;
//! conversion is only used for progress logging.

use chrono::{DateTime, Utc};

/// `datenum(1970, 1, 1)`.
pub const UNIX_EPOCH_DATENUM: f64 = 719_529.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Converts a MATLAB serial date to UTC, or `None` when the value is not
/// finite or falls outside chrono's range.
pub fn to_datetime(serial_date: f64) -> Option<DateTime<Utc>> {
    if !serial_date.is_finite() {
        return None;
    }
    let seconds = (serial_date - UNIX_EPOCH_DATENUM) * SECONDS_PER_DAY;
    if seconds.abs() >= i64::MAX as f64 {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    // Rounding can carry a full second.
    if nanos >= 1_000_000_000 {
        return DateTime::from_timestamp(whole as i64 + 1, 0);
    }
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Formats a serial date for log output, falling back to the raw number.
pub fn describe(serial_date: f64) -> String {
    match to_datetime(serial_date) {
        Some(datetime) => datetime.to_rfc3339(),
        None => format!("{serial_date} (not a valid serial date)"),
    }
}
