//! Shared types for the funnel pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Raw record ──────────────────────────────────────────────────────

/// A message as produced by a mail source.
///
/// Immutable once fetched. `body` is `None` when the provider returned no
/// text part at all, which the classifier treats differently from an empty
/// string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Provider message ID (unique within a fetch).
    pub message_id: String,
    /// Sender address, expected to contain `@domain`.
    pub sender: String,
    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,
    /// Plain-text body.
    #[serde(default)]
    pub body: Option<String>,
    /// When the provider received the message, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl EmailRecord {
    pub fn new(message_id: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            sender: sender.into(),
            subject: None,
            body: None,
            received_at: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }
}

// ── Labels ──────────────────────────────────────────────────────────

/// Job-application pipeline stage inferred from email text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    ApplicationConfirmation,
    JobFilled,
    Reject,
}

impl Label {
    /// Tie-break order: the first label present in a candidate set wins.
    pub const PRIORITY: [Label; 3] = [Label::Reject, Label::JobFilled, Label::ApplicationConfirmation];

    /// Order used when emitting rows for labels that never occurred.
    pub const CANONICAL: [Label; 3] = [Label::ApplicationConfirmation, Label::JobFilled, Label::Reject];

    /// Label used when nothing else applies.
    pub const DEFAULT: Label = Label::ApplicationConfirmation;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationConfirmation => "application_confirmation",
            Self::JobFilled => "job_filled",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a label was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Body was missing; defaulted before keyword matching.
    MissingBody,
    /// At least one keyword matched.
    Keyword,
    /// No keyword matched; the default label was substituted.
    Fallback,
}

// ── Derived records ─────────────────────────────────────────────────

/// An application email with its stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEmail {
    pub record: EmailRecord,
    pub classification: Label,
    pub source: ClassificationSource,
}

impl ClassifiedEmail {
    pub fn sender(&self) -> &str {
        &self.record.sender
    }
}

/// A calendar-invite email attributed to a company domain.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingRecord {
    pub record: EmailRecord,
    pub domain: String,
}

// ── Aggregates ──────────────────────────────────────────────────────

/// Stage name of the synthetic ghosted row.
pub const GHOSTED_STAGE: &str = "ghosted";

/// One row of the funnel table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelRow {
    pub stage: String,
    pub emails: usize,
}

impl FunnelRow {
    pub fn new(stage: impl Into<String>, emails: usize) -> Self {
        Self {
            stage: stage.into(),
            emails,
        }
    }
}

/// Interview count for one company domain, after overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInterviews {
    pub domain: String,
    pub interviews: usize,
}

/// How many companies reached a given number of interview stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewStageRow {
    pub interview_stage: usize,
    pub no_interviews_per_stage: usize,
}

/// Everything the report emitter needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelReport {
    /// Application emails considered after the self-address filter.
    pub total_emails: usize,
    /// Application emails dropped because they were self-authored.
    pub self_excluded: usize,
    /// Share of emails that no keyword matched, in `[0, 1]`.
    pub unclassified_ratio: f64,
    /// Distinct domains with at least one meeting.
    pub companies_interviewed: usize,
    /// Meeting records skipped for a malformed sender.
    pub skipped_meetings: usize,
    pub funnel: Vec<FunnelRow>,
    pub per_domain: Vec<DomainInterviews>,
    pub interview_stages: Vec<InterviewStageRow>,
}

impl FunnelReport {
    /// Count for a funnel stage, zero when the stage is absent.
    pub fn stage(&self, stage: &str) -> usize {
        self.funnel
            .iter()
            .find(|row| row.stage == stage)
            .map_or(0, |row| row.emails)
    }

    /// Interview count for a domain, if it had any meetings.
    pub fn interviews_for(&self, domain: &str) -> Option<usize> {
        self.per_domain
            .iter()
            .find(|d| d.domain == domain)
            .map(|d| d.interviews)
    }
}
