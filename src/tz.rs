//! Timezone resolution for local day assignment
//!
//! Every metric file declares the IANA zone its samples were recorded in, and
//! day-boundary logic must use that zone, never UTC or the query's zone. The
//! exporter only ever emits zones from a known set, so resolution is a fixed
//! offset table; unknown zones fall back to UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Offsets in seconds east of UTC for the zones the exporter emits.
const ZONE_OFFSETS: &[(&str, i32)] = &[
    ("Asia/Shanghai", 8 * 3600),
    ("Asia/Hong_Kong", 8 * 3600),
    ("Asia/Taipei", 8 * 3600),
    ("Asia/Tokyo", 9 * 3600),
    ("Asia/Seoul", 9 * 3600),
    ("Asia/Singapore", 8 * 3600),
    ("Asia/Kolkata", 5 * 3600 + 1800),
    ("Asia/Dubai", 4 * 3600),
    ("Europe/London", 0),
    ("Europe/Paris", 3600),
    ("Europe/Berlin", 3600),
    ("Europe/Moscow", 3 * 3600),
    ("America/New_York", -5 * 3600),
    ("America/Chicago", -6 * 3600),
    ("America/Denver", -7 * 3600),
    ("America/Los_Angeles", -8 * 3600),
    ("America/Anchorage", -9 * 3600),
    ("Pacific/Honolulu", -10 * 3600),
    ("Australia/Sydney", 11 * 3600),
    ("Australia/Melbourne", 11 * 3600),
    ("Pacific/Auckland", 13 * 3600),
    ("UTC", 0),
];

/// Seconds east of UTC for `zone`, 0 for unknown zones.
pub fn offset_seconds(zone: &str) -> i32 {
    ZONE_OFFSETS
        .iter()
        .find(|(name, _)| *name == zone)
        .map(|(_, secs)| *secs)
        .unwrap_or(0)
}

/// Convert a UTC instant to naive local time in `zone`.
pub fn to_local(ts: DateTime<Utc>, zone: &str) -> NaiveDateTime {
    (ts + Duration::seconds(i64::from(offset_seconds(zone)))).naive_utc()
}

/// The local calendar date a UTC instant falls on in `zone`.
pub fn local_date(ts: DateTime<Utc>, zone: &str) -> NaiveDate {
    to_local(ts, zone).date()
}
