//! Timestamp encoding for TEXT columns.
//!
//! Stored values are fixed-width RFC 3339 in UTC so that lexical order in
//! SQL matches chronological order.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

pub(crate) fn encode(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM:SS` form written by
/// `SQLite`'s `datetime()`.
pub(crate) fn decode(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{raw}': {e}")))
}

pub(crate) fn decode_opt(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(decode).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encode_is_fixed_width() {
        let a = encode(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(a, "2026-01-02T03:04:05.000000Z");
    }

    #[test]
    fn test_decode_sqlite_datetime() {
        let dt = decode("2026-01-02 03:04:05").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(decode("yesterday"), Err(DatabaseError::Decode(_))));
    }
}
