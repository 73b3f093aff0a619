//! Lenient timestamp parsing for provider strings.
//!
//! Every parser returns `None` instead of an error: a value that cannot be
//! read becomes a missing timestamp, and the caller decides what to do with
//! the row.

use crate::types::into_utc_trait::IntoUtcDateTime;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub const MILLIS_PER_HOUR: i64 = 3_600_000;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
];

const NAIVE_FORMATS: [&str; 12] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses a timestamp string into UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS[.f]]` with or without an offset,
/// US-style `MM/DD/YYYY` variants and bare dates (midnight). Strings without
/// an offset are taken to be UTC already.
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let value = value.strip_suffix(" UTC").unwrap_or(value);

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.into_utc());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.into_utc());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.into_utc());
        }
    }
    parse_date(value).map(IntoUtcDateTime::into_utc)
}

/// Parses a calendar date, ignoring anything after the first whitespace.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let token = value.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}

/// Reads an hour-of-day written as `13`, `13.0` or `13:00`.
pub fn parse_hour(value: &str) -> Option<u32> {
    let value = value.trim();
    let hour = if let Ok(hour) = value.parse::<u32>() {
        hour
    } else if let Some((head, _)) = value.split_once(':') {
        head.trim().parse::<u32>().ok()?
    } else {
        let float = value.parse::<f64>().ok()?;
        if float.fract() != 0.0 || float < 0.0 {
            return None;
        }
        float as u32
    };
    (hour < 24).then_some(hour)
}

/// Combines a date field and an hour-of-day field into a UTC instant.
pub fn combine_date_and_hour(date: &str, hour: &str) -> Option<DateTime<Utc>> {
    let date = parse_date(date)?;
    let hour = parse_hour(hour)?;
    date.and_hms_opt(hour, 0, 0).map(IntoUtcDateTime::into_utc)
}

/// Reads seconds since the Unix epoch, integral or fractional.
pub fn parse_epoch_seconds(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0);
    }
    let seconds = value.parse::<f64>().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

/// Truncates epoch milliseconds to the start of their hour.
pub fn floor_to_hour(millis: i64) -> i64 {
    millis - millis.rem_euclid(MILLIS_PER_HOUR)
}

/// Formats epoch milliseconds as ISO-8601 UTC with a `Z` suffix.
pub fn format_iso_utc(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_utc_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 5, 13, 0, 0).unwrap();
        for input in [
            "2024-01-05T13:00:00Z",
            "2024-01-05 13:00:00+00:00",
            "2024-01-05 13:00:00",
            "2024-01-05 13:00",
            "2024-01-05T13:00",
            "2024-01-05 13:00:00.000 UTC",
            "01/05/2024 13:00",
            "2024-01-05T03:00:00-10:00",
        ] {
            assert_eq!(parse_utc(input), Some(expected), "input {input}");
        }
    }

    #[test]
    fn test_parse_utc_rejects_garbage() {
        assert_eq!(parse_utc(""), None);
        assert_eq!(parse_utc("   "), None);
        assert_eq!(parse_utc("not a time"), None);
        assert_eq!(parse_utc("2024-13-45 99:00"), None);
    }

    #[test]
    fn test_combine_date_and_hour() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap();
        assert_eq!(combine_date_and_hour("2024-01-05", "7"), Some(expected));
        assert_eq!(combine_date_and_hour("2024-01-05 ", " 7.0"), Some(expected));
        assert_eq!(combine_date_and_hour("01/05/2024", "07:00"), Some(expected));
        assert_eq!(combine_date_and_hour("2024-01-05", "24"), None);
        assert_eq!(combine_date_and_hour("2024-01-05", "x"), None);
        assert_eq!(combine_date_and_hour("yesterday", "7"), None);
    }

    #[test]
    fn test_parse_epoch_seconds() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(parse_epoch_seconds("1700000000"), Some(expected));
        assert_eq!(parse_epoch_seconds("1700000000.0"), Some(expected));
        assert_eq!(parse_epoch_seconds("NaN"), None);
        assert_eq!(parse_epoch_seconds(""), None);
    }

    #[test]
    fn test_floor_to_hour() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 7, 59, 59).unwrap();
        let floored = floor_to_hour(ts.timestamp_millis());
        assert_eq!(
            floored,
            Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0)
                .unwrap()
                .timestamp_millis()
        );
        assert_eq!(floor_to_hour(-1), -MILLIS_PER_HOUR);
    }

    #[test]
    fn test_format_iso_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap();
        assert_eq!(
            format_iso_utc(ts.timestamp_millis()).as_deref(),
            Some("2024-01-05T07:00:00Z")
        );
    }
}
