//! Parsing of wire timestamps into `DateTime<Utc>`.
//!
//! The store writes `toString(datetime())`, i.e. RFC 3339 with a `Z` offset
//! and up to nanosecond precision. Older records may carry a naive ISO-8601
//! value without an offset; those are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{InkgraphError, Result};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a stored timestamp string.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(InkgraphError::Timestamp {
        value: value.to_string(),
        reason: "expected RFC 3339 or ISO-8601 date/time".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn parses_neo4j_datetime_string() {
        let dt = parse_timestamp("2024-03-09T17:04:05.123456789Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.hour(), 17);
        assert_eq!(dt.nanosecond(), 123_456_789);
    }

    #[test]
    fn normalizes_offsets_to_utc() {
        let dt = parse_timestamp("2024-03-09T12:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap());
    }

    #[test]
    fn naive_values_are_read_as_utc() {
        let dt = parse_timestamp("2024-03-09T12:30:00.5").unwrap();
        assert_eq!(dt.minute(), 30);
        assert_eq!(parse_timestamp("2024-03-09").unwrap().hour(), 0);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, InkgraphError::Timestamp { .. }));
    }
}
