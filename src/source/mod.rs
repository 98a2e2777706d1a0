//! Mail sources — where raw records come from.
//!
//! A source only does I/O: it answers a `MailQuery` with `EmailRecord`s.
//! Classification and aggregation live in `pipeline`.

pub mod jsonl;

use chrono::NaiveDate;

use crate::error::SourceError;
use crate::pipeline::types::EmailRecord;

pub use jsonl::JsonlMailSource;

/// Which record set a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Mail mentioning an application.
    Applications,
    /// Mail carrying a calendar invite.
    Meetings,
}

/// A record selection with an optional date threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailQuery {
    pub kind: QueryKind,
    pub after: Option<NaiveDate>,
}

impl MailQuery {
    pub fn applications(after: Option<NaiveDate>) -> Self {
        Self {
            kind: QueryKind::Applications,
            after,
        }
    }

    pub fn meetings(after: Option<NaiveDate>) -> Self {
        Self {
            kind: QueryKind::Meetings,
            after,
        }
    }

    /// Provider search syntax for this query.
    pub fn search_string(&self) -> String {
        let base = match self.kind {
            QueryKind::Applications => r#""applying" OR "application""#,
            QueryKind::Meetings => "filename:ics OR filename:ical OR filename:icalendar",
        };
        match self.after {
            Some(date) => format!("{base} after:{}", date.format("%Y/%m/%d")),
            None => base.to_string(),
        }
    }

    /// Whether a record passes the date threshold. Undated records pass.
    pub fn admits(&self, record: &EmailRecord) -> bool {
        match (self.after, record.received_at) {
            (Some(after), Some(received)) => received.date_naive() >= after,
            _ => true,
        }
    }
}

/// A provider of raw email records.
pub trait MailSource {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Fetch all records matching `query`.
    fn fetch(&self, query: &MailQuery) -> Result<Vec<EmailRecord>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn application_search_string() {
        let q = MailQuery::applications(Some(date(2023, 11, 1)));
        assert_eq!(
            q.search_string(),
            r#""applying" OR "application" after:2023/11/01"#
        );
    }

    #[test]
    fn meeting_search_string_without_threshold() {
        let q = MailQuery::meetings(None);
        assert_eq!(
            q.search_string(),
            "filename:ics OR filename:ical OR filename:icalendar"
        );
    }

    #[test]
    fn admits_by_date() {
        let q = MailQuery::applications(Some(date(2023, 11, 1)));
        let before = EmailRecord::new("1", "a@b.com")
            .with_received_at(Utc.with_ymd_and_hms(2023, 10, 31, 23, 0, 0).unwrap());
        let same_day = EmailRecord::new("2", "a@b.com")
            .with_received_at(Utc.with_ymd_and_hms(2023, 11, 1, 8, 0, 0).unwrap());
        let undated = EmailRecord::new("3", "a@b.com");

        assert!(!q.admits(&before));
        assert!(q.admits(&same_day));
        assert!(q.admits(&undated));
    }

    #[test]
    fn no_threshold_admits_everything() {
        let q = MailQuery::meetings(None);
        let old = EmailRecord::new("1", "a@b.com")
            .with_received_at(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
        assert!(q.admits(&old));
    }
}
