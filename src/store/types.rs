//! Record type and release-date parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Fixed date-time format used by the remote feed.
const RELEASE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Date-only form the feed emits for most entries.
const RELEASE_DATE_SHORT_FORMAT: &str = "%Y-%m-%d";

/// One synchronized feed record.
///
/// Owned by the record store: created by the persist operation,
/// destroyed by the prune operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRecord {
    /// Stable server-assigned identity.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Synopsis text.
    pub overview: String,
    /// Poster image reference, when the feed provides one.
    pub poster_ref: Option<String>,
    /// Release date; defaults to now when absent or unparseable.
    pub release_date: DateTime<Utc>,
    /// Feed popularity score; defaults to 0 when absent.
    pub popularity: f64,
    /// Page number this record was downloaded as part of.
    ///
    /// Monotonically non-decreasing across fetch cycles.
    pub page: u32,
}

/// Parse a feed release date, defaulting to now on absence or failure.
///
/// A local parse problem must never block the sync run, so this cannot
/// fail.
pub fn parse_release_date(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return Utc::now();
    };

    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, RELEASE_DATE_FORMAT) {
        return dt.and_utc();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, RELEASE_DATE_SHORT_FORMAT) {
        return date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    }

    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_full_datetime() {
        let dt = parse_release_date(Some("2020-10-01T12:30:45"));
        assert_eq!(
            (dt.year(), dt.month(), dt.day(), dt.hour(), dt.minute()),
            (2020, 10, 1, 12, 30)
        );
    }

    #[test]
    fn parses_date_only_fallback() {
        let dt = parse_release_date(Some("2020-10-01"));
        assert_eq!((dt.year(), dt.month(), dt.day()), (2020, 10, 1));
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn absent_or_garbage_defaults_to_now() {
        let before = Utc::now();
        let absent = parse_release_date(None);
        let garbage = parse_release_date(Some("next tuesday"));
        let after = Utc::now();

        assert!(absent >= before && absent <= after);
        assert!(garbage >= before && garbage <= after);
    }
}
