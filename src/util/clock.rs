//! Wall-clock helpers and ISO-8601 parsing.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Date-time layouts with an offset. `%z` also accepts the `+hh:mm` form.
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// Date-time layouts without an offset, interpreted in local time.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an absolute ISO-8601 timestamp.
///
/// Accepts RFC 3339 (`2030-01-01T09:00:00Z`, `2030-01-01T09:00:00+05:30`), offsets
/// without a colon, minute or hour precision, a space instead of `T`, naive
/// date-times, and bare dates (midnight). Naive values are
/// interpreted in the local timezone. Returns `None` for anything else, including
/// cron expressions.
pub fn parse_iso8601(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    let input = expand_hour_only(input);
    let input = match input.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => input,
    };
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&input, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&input, format) {
            return local_to_utc(&naive);
        }
    }
    NaiveDate::parse_from_str(&input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| local_to_utc(&naive))
}

/// `2030-01-01T09` becomes `2030-01-01T09:00`; chrono needs the minutes.
fn expand_hour_only(input: &str) -> String {
    let bytes = input.as_bytes();
    let hour_only = bytes.len() == 13
        && matches!(bytes[10], b'T' | b' ')
        && bytes[11..].iter().all(u8::is_ascii_digit);
    if hour_only {
        format!("{input}:00")
    } else {
        input.to_string()
    }
}

fn local_to_utc(naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
