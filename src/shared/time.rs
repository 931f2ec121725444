use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Current instant in UTC. All persisted timestamps go through this.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a user-supplied timestamp string into a UTC instant.
/// Accepts RFC3339/ISO-8601 and date-only (YYYY-MM-DD, midnight UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::parse_timestamp;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = parse_timestamp("2026-03-01T12:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.minute(), 30);
    }

    #[test]
    fn parses_date_only_as_midnight_utc() {
        let ts = parse_timestamp("2026-03-01").unwrap();
        assert_eq!(ts.day(), 1);
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("not a time").is_none());
    }
}
