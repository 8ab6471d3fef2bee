use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{Error, Result};

/// Offset form written by the benchmark harness, e.g. `2024-06-01T10:00:00.123456+0200`.
const COMPACT_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an ISO 8601 timestamp, keeping its UTC offset.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_instant(s: &str) -> Result<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t);
    }
    if let Ok(t) = DateTime::parse_from_str(s, COMPACT_OFFSET_FORMAT) {
        return Ok(t);
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    Err(Error::parse(
        format!("timestamp {s:?}"),
        "not an ISO 8601 instant",
    ))
}

/// Signed number of seconds from `from` to `to`.
pub fn seconds_between(from: &DateTime<FixedOffset>, to: &DateTime<FixedOffset>) -> f64 {
    let delta = *to - *from;
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

pub fn format_instant(t: &DateTime<FixedOffset>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub(crate) mod serde_instant {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_instant(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instant() {
        let expected = DateTime::parse_from_rfc3339("2024-06-01T10:00:00.5+02:00").unwrap();

        assert_eq!(parse_instant("2024-06-01T10:00:00.5+02:00").unwrap(), expected);
        assert_eq!(parse_instant("2024-06-01T10:00:00.500000+0200").unwrap(), expected);
        assert_eq!(parse_instant(" 2024-06-01T10:00:00.5+02:00\n").unwrap(), expected);
        assert_eq!(
            parse_instant("2024-06-01T08:00:00.5").unwrap(),
            expected.with_timezone(&Utc).fixed_offset()
        );
        assert_eq!(
            parse_instant("2024-06-01T08:00:00.5Z").unwrap().offset().local_minus_utc(),
            0
        );

        assert!(matches!(
            parse_instant("yesterday"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_seconds_between() {
        let a = parse_instant("2024-06-01T10:00:00+02:00").unwrap();
        let b = parse_instant("2024-06-01T08:00:02.25Z").unwrap();
        assert_eq!(seconds_between(&a, &b), 2.25);
        assert_eq!(seconds_between(&b, &a), -2.25);
    }

    #[test]
    fn test_format_instant_keeps_offset() {
        let t = parse_instant("2024-06-01T10:00:00.123456+0200").unwrap();
        assert_eq!(format_instant(&t), "2024-06-01T10:00:00.123456+02:00");
    }
}
