//! Session and time-played accounting math
//!
//! Time played accrues only from closed sessions; an open session's
//! elapsed time is a derived quantity until the session closes. All
//! durations are integer milliseconds. Wall-clock timestamps are stored
//! as naive local `YYYY-MM-DD HH:MM:SS` strings and re-rendered as
//! ISO-8601 for display.

use chrono::{Local, NaiveDateTime, TimeZone, Utc};

/// Storage format for wall-clock timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Current epoch time in milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Total time played given the stored base and an optional open session.
///
/// `session_start_ms == 0` encodes "offline". A start timestamp ahead of
/// `now_ms` (clock skew) contributes zero rather than going negative.
pub fn live_time_played(time_played_ms: i64, session_start_ms: i64, now_ms: i64) -> i64 {
    if session_start_ms > 0 {
        time_played_ms + (now_ms - session_start_ms).max(0)
    } else {
        time_played_ms
    }
}

/// Whole hours played, floored.
pub fn hours_played(time_played_ms: i64, session_start_ms: i64, now_ms: i64) -> i64 {
    live_time_played(time_played_ms, session_start_ms, now_ms) / MILLIS_PER_HOUR
}

/// Render an epoch-millisecond instant as a stored wall-clock string.
pub fn wall_clock_string(epoch_ms: i64) -> String {
    match Local.timestamp_millis_opt(epoch_ms) {
        chrono::LocalResult::Single(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        // Ambiguous or out-of-range instants (DST folds, absurd inputs)
        _ => Local::now().format(TIMESTAMP_FORMAT).to_string(),
    }
}

/// Re-render a stored wall-clock string as ISO-8601.
///
/// Returns the stored text unchanged when it does not parse, so old or
/// hand-edited rows still display something.
pub fn iso8601_string(stored: &str) -> String {
    NaiveDateTime::parse_from_str(stored, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc().format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|_| stored.to_string())
}

/// Human-readable duration, largest two units only.
pub fn format_duration(milliseconds: i64) -> String {
    let total_seconds = milliseconds.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!(
            "{} {}, {} {}",
            hours,
            plural(hours, "hour"),
            minutes,
            plural(minutes, "minute")
        )
    } else if minutes > 0 {
        format!(
            "{} {}, {} {}",
            minutes,
            plural(minutes, "minute"),
            seconds,
            plural(seconds, "second")
        )
    } else {
        format!("{} {}", seconds, plural(seconds, "second"))
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}
