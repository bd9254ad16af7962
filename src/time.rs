//! Timestamp helpers shared by token issuance, persistence and responses.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Convert a Unix timestamp to the datetime format SQLite's `datetime('now')`
/// produces: `YYYY-MM-DD HH:MM:SS`. Strings in this format compare
/// lexicographically in timestamp order.
pub fn sqlite_datetime(timestamp: u64) -> String {
    let (year, month, day, hours, minutes, seconds) = split_timestamp(timestamp);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, month, day, hours, minutes, seconds
    )
}

/// Current time in SQLite datetime format.
pub fn now_sqlite_datetime() -> String {
    sqlite_datetime(unix_now())
}

/// Convert a Unix timestamp to an ISO-8601 UTC string for JSON payloads.
pub fn iso8601(timestamp: u64) -> String {
    let (year, month, day, hours, minutes, seconds) = split_timestamp(timestamp);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hours, minutes, seconds
    )
}

fn split_timestamp(timestamp: u64) -> (i32, u32, u32, u64, u64, u64) {
    let days_since_epoch = timestamp / 86400;
    let time_of_day = timestamp % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (year, month, day) = days_to_ymd(days_since_epoch as i64);
    (year, month, day, hours, minutes, seconds)
}

/// Convert days since Unix epoch to year, month, day.
fn days_to_ymd(days: i64) -> (i32, u32, u32) {
    // Algorithm from http://howardhinnant.github.io/date_algorithms.html
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as i32, m, d)
}
