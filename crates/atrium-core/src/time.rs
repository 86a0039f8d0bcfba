//! Lightweight UTC date/time utilities (no chrono dependency).
//!
//! Uses Howard Hinnant's civil-date algorithms for Unix-to-date conversion
//! and back. Timespans are stored as Unix seconds; visits carry a
//! `YYYY-MM-DD` day string for daily audit views.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Current UTC timestamp in ISO-8601 format.
pub fn now_iso8601() -> String {
    unix_to_iso8601(now_unix_secs())
}

/// Convert Unix seconds to ISO-8601 UTC string.
pub fn unix_to_iso8601(secs: u64) -> String {
    let days = (secs / 86400) as i64;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}Z")
}

/// The `YYYY-MM-DD` day a Unix timestamp falls on (UTC).
pub fn day_from_unix(secs: u64) -> String {
    let (y, m, d) = civil_from_days((secs / 86400) as i64);
    format!("{y:04}-{m:02}-{d:02}")
}

/// Parse an ISO-8601 UTC timestamp (`YYYY-MM-DDTHH:MM:SS`, optional
/// trailing `Z`) into Unix seconds. Returns `None` on any malformed or
/// out-of-range field; years outside 1970..=9999 are rejected.
pub fn parse_iso8601(s: &str) -> Option<u64> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    let (date, time) = s.split_once('T')?;
    let (y, m, d) = parse_day_fields(date)?;

    let mut parts = time.splitn(3, ':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    let days = days_from_civil(y, m, d) as u64;
    Some(days * 86400 + hours * 3600 + minutes * 60 + seconds)
}

/// Validate and canonicalize a `YYYY-MM-DD` day string.
pub fn parse_day(s: &str) -> Option<String> {
    let (y, m, d) = parse_day_fields(s)?;
    Some(format!("{y:04}-{m:02}-{d:02}"))
}

fn parse_day_fields(s: &str) -> Option<(i64, u64, u64)> {
    let mut parts = s.splitn(3, '-');
    let y: i64 = parts.next()?.parse().ok()?;
    let m: u64 = parts.next()?.parse().ok()?;
    let d: u64 = parts.next()?.parse().ok()?;
    // year bound keeps days_from_civil well inside i64 range
    if !(1970..=9999).contains(&y) || !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }
    Some((y, m, d))
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Inverse of `civil_from_days`: (year, month, day) → Unix epoch days.
fn days_from_civil(y: i64, m: u64, d: u64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        assert_eq!(unix_to_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_known_date() {
        // 2026-02-21T00:00:00Z = 1771632000
        assert_eq!(unix_to_iso8601(1771632000), "2026-02-21T00:00:00Z");
    }

    #[test]
    fn test_roundtrip_parse_format() {
        for secs in [0u64, 951_827_696, 1_771_632_000, 4_102_444_799] {
            let iso = unix_to_iso8601(secs);
            assert_eq!(parse_iso8601(&iso), Some(secs), "roundtrip failed for {iso}");
        }
    }

    #[test]
    fn test_parse_without_zulu() {
        assert_eq!(parse_iso8601("1970-01-02T00:00:00"), Some(86400));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_iso8601("not-a-date").is_none());
        assert!(parse_iso8601("2026-13-01T00:00:00Z").is_none());
        assert!(parse_iso8601("2026-01-01T25:00:00Z").is_none());
        assert!(parse_iso8601("2026-01-01").is_none());
    }

    #[test]
    fn test_parse_rejects_out_of_range_year() {
        // parseable as i64 but far outside the supported range
        assert!(parse_iso8601("99999999999999999-01-01T00:00:00Z").is_none());
        assert!(parse_iso8601("10000-01-01T00:00:00Z").is_none());
        assert!(parse_iso8601("1969-12-31T23:59:59Z").is_none());
        assert!(parse_day("99999999999999999-01-01").is_none());
        assert_eq!(parse_iso8601("9999-12-31T23:59:59Z"), Some(253_402_300_799));
    }

    #[test]
    fn test_day_from_unix() {
        assert_eq!(day_from_unix(0), "1970-01-01");
        assert_eq!(day_from_unix(1771632000 + 3600), "2026-02-21");
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("2026-02-21").as_deref(), Some("2026-02-21"));
        assert_eq!(parse_day("2026-2-3").as_deref(), Some("2026-02-03"));
        assert!(parse_day("2026-00-10").is_none());
        assert!(parse_day("yesterday").is_none());
    }

    #[test]
    fn test_now_is_recent() {
        let ts = now_iso8601();
        assert!(ts.starts_with("202"), "timestamp should be in 2020s: {ts}");
    }
}
