use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// Current time at storage precision, so values read back compare equal.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Canonical storage form: RFC 3339, UTC, millisecond precision.
/// Fixed width, so lexical order matches chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp. Accepts any RFC 3339 offset, plus SQLite's
/// `datetime('now')` form ("YYYY-MM-DD HH:MM:SS", implicitly UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc()))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_fixed_width_millis() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-02T08:00:00.000Z");
    }

    #[test]
    fn parses_offsets_and_sqlite_form() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-02T16:00:00+08:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-02 08:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-02T08:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
