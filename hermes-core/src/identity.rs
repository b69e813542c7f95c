//! Identity types for Hermes rows
//!
//! The server assigns integer primary keys from auto-increment columns. Each
//! table gets its own newtype so a report id can never be passed where a user
//! id is expected.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

macro_rules! define_row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_row_id!(
    /// `FS_statistic_id`
    StatisticId
);
define_row_id!(
    /// `PR_report_id`, also referenced by `VR_report_id`.
    ReportId
);
define_row_id!(
    /// `VR_verification_id`
    VerificationId
);
define_row_id!(
    /// `RL_response_id`
    ResponseId
);
define_row_id!(
    /// `UA_user_id`
    UserId
);
define_row_id!(
    /// `MS_media_id`
    MediaId
);

/// Parse a server timestamp.
///
/// Flask serializes MySQL datetimes as RFC 2822 (`Tue, 01 Apr 2025 10:00:00 GMT`),
/// rows written by clients carry RFC 3339, and raw column dumps use
/// `YYYY-MM-DD HH:MM:SS` in UTC. Anything else yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc2822_gmt() {
        let ts = parse_timestamp("Tue, 01 Apr 2025 10:00:00 GMT").expect("rfc2822 should parse");
        assert_eq!(ts.year(), 2025);
        assert_eq!(ts.month(), 4);
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_timestamp("2025-04-01T18:00:00+08:00").expect("rfc3339 should parse");
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn test_parse_mysql_datetime() {
        let ts = parse_timestamp("2025-04-01 10:00:00").expect("mysql datetime should parse");
        assert_eq!(ts.minute(), 0);
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = ReportId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: ReportId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
        assert_eq!(id.to_string(), "42");
    }
}
