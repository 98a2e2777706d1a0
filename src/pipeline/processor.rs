//! Funnel pipeline — classifies fetched records and builds the report.
//!
//! Flow:
//! 1. Fetch application and meeting records from a `MailSource`
//! 2. Classify every application email
//! 3. Attribute every meeting to a sender domain (malformed senders skipped)
//! 4. Aggregate into a `FunnelReport`

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::domain::extract_domain;
use crate::pipeline::funnel::{FunnelSettings, build_funnel};
use crate::pipeline::rules::Classifier;
use crate::pipeline::types::{ClassifiedEmail, EmailRecord, FunnelReport, MeetingRecord};
use crate::source::{MailQuery, MailSource};

/// Batch pipeline from raw records to a funnel report.
pub struct FunnelPipeline {
    classifier: Classifier,
    settings: FunnelSettings,
    self_address: String,
}

impl FunnelPipeline {
    pub fn new(classifier: Classifier, settings: FunnelSettings, self_address: impl Into<String>) -> Self {
        Self {
            classifier,
            settings,
            self_address: self_address.into(),
        }
    }

    /// Fetch both record sets from `source` and build the report.
    pub fn run(&self, source: &dyn MailSource, after: Option<NaiveDate>) -> Result<FunnelReport> {
        let applications_query = MailQuery::applications(after);
        let meetings_query = MailQuery::meetings(after);

        info!(
            source = source.name(),
            query = %applications_query.search_string(),
            "Fetching application emails"
        );
        let applications = source.fetch(&applications_query)?;

        info!(
            source = source.name(),
            query = %meetings_query.search_string(),
            "Fetching meeting emails"
        );
        let meetings = source.fetch(&meetings_query)?;

        Ok(self.build_report(applications, meetings))
    }

    /// Build a report from already-fetched records.
    pub fn build_report(
        &self,
        applications: Vec<EmailRecord>,
        meetings: Vec<EmailRecord>,
    ) -> FunnelReport {
        info!(
            applications = applications.len(),
            meetings = meetings.len(),
            "Processing records"
        );

        let classified: Vec<ClassifiedEmail> = applications
            .into_iter()
            .map(|record| self.classifier.evaluate(record))
            .collect();

        let (meetings, skipped_meetings) = attribute_meetings(meetings);

        let funnel = build_funnel(&classified, &meetings, &self.self_address, &self.settings);

        let unclassified_ratio = if funnel.total_emails == 0 {
            0.0
        } else {
            funnel.fallback_emails as f64 / funnel.total_emails as f64
        };

        FunnelReport {
            total_emails: funnel.total_emails,
            self_excluded: funnel.self_excluded,
            unclassified_ratio,
            companies_interviewed: funnel.companies_interviewed,
            skipped_meetings,
            funnel: funnel.rows,
            per_domain: funnel.per_domain,
            interview_stages: funnel.interview_stages,
        }
    }
}

/// Attach a domain to each meeting, skipping records without one.
///
/// Returns the attributed meetings and the number skipped.
pub fn attribute_meetings(records: Vec<EmailRecord>) -> (Vec<MeetingRecord>, usize) {
    let mut meetings = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for record in records {
        match extract_domain(&record.sender) {
            Ok(domain) => {
                let domain = domain.to_string();
                meetings.push(MeetingRecord { record, domain });
            }
            Err(e) => {
                warn!(message_id = %record.message_id, error = %e, "Skipping meeting");
                skipped += 1;
            }
        }
    }

    (meetings, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Label;

    fn pipeline() -> FunnelPipeline {
        FunnelPipeline::new(Classifier::default(), FunnelSettings::default(), "me@home.com")
    }

    #[test]
    fn attribute_meetings_skips_malformed() {
        let records = vec![
            EmailRecord::new("m1", "a@acme.com"),
            EmailRecord::new("m2", "calendar-bot"),
            EmailRecord::new("m3", "b@beta.io"),
        ];
        let (meetings, skipped) = attribute_meetings(records);
        assert_eq!(skipped, 1);
        let domains: Vec<&str> = meetings.iter().map(|m| m.domain.as_str()).collect();
        assert_eq!(domains, ["acme.com", "beta.io"]);
    }

    #[test]
    fn unclassified_ratio_counts_fallbacks() {
        let applications = vec![
            EmailRecord::new("1", "a@x.com").with_body("zzz"),
            EmailRecord::new("2", "b@y.com").with_body("unfortunately no"),
            EmailRecord::new("3", "c@z.com"),
            EmailRecord::new("4", "d@w.com").with_body("we will review"),
        ];
        let report = pipeline().build_report(applications, vec![]);
        assert_eq!(report.total_emails, 4);
        assert!((report.unclassified_ratio - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_input_has_zero_ratio() {
        let report = pipeline().build_report(vec![], vec![]);
        assert_eq!(report.unclassified_ratio, 0.0);
        assert_eq!(report.stage("ghosted"), 0);
        assert_eq!(report.funnel.len(), 4);
    }

    #[test]
    fn self_sent_mail_is_excluded() {
        let applications = vec![
            EmailRecord::new("1", "me@home.com").with_body("unfortunately"),
            EmailRecord::new("2", "jobs@acme.com").with_body("unfortunately"),
        ];
        let report = pipeline().build_report(applications, vec![]);
        assert_eq!(report.self_excluded, 1);
        assert_eq!(report.stage(Label::Reject.as_str()), 1);
    }
}
