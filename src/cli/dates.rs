//! Date flag parsing

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Parse a date flag relative to `now`
///
/// Accepts RFC 3339 instants, `YYYY-MM-DD` (midnight UTC), and `Nd` / `Nw`
/// meaning that many days or weeks before `now`.
pub fn parse_date(flag: &str, value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    if let Some(ago) = parse_relative(value) {
        return Ok(now - ago);
    }

    Err(Error::invalid_value(
        flag,
        format!("unsupported date '{value}'. Use YYYY-MM-DD, RFC 3339, or relative (7d, 2w)"),
    ))
}

fn parse_relative(value: &str) -> Option<Duration> {
    if let Some(days) = value.strip_suffix('d') {
        return Duration::try_days(parse_count(days)?);
    }
    let weeks = value.strip_suffix('w')?;
    Duration::try_weeks(parse_count(weeks)?)
}

fn parse_count(value: &str) -> Option<i64> {
    value.parse().ok().filter(|n| *n >= 0)
}
