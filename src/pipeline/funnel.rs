//! Funnel aggregation — stage counts, interviewed companies, ghosted.
//!
//! All lookups are by key. Row position never carries meaning, so the
//! result does not depend on the order records arrive in (apart from the
//! display order of rows, which follows first occurrence).

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::pipeline::domain::is_self_address;
use crate::pipeline::types::{
    ClassificationSource, ClassifiedEmail, DomainInterviews, FunnelRow, GHOSTED_STAGE,
    InterviewStageRow, Label, MeetingRecord,
};

/// Default cut-off for the interview-stage distribution. Domains with this
/// many stages or more are treated as recruiting-pipeline noise.
pub const DEFAULT_MAX_INTERVIEW_STAGE: usize = 9;

/// Aggregation knobs supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunnelSettings {
    /// Forced per-domain interview counts (domain → count).
    pub domain_overrides: BTreeMap<String, usize>,
    /// Domains with at least this many interview stages are left out of
    /// the distribution.
    pub max_interview_stage: usize,
}

impl Default for FunnelSettings {
    fn default() -> Self {
        Self {
            domain_overrides: BTreeMap::new(),
            max_interview_stage: DEFAULT_MAX_INTERVIEW_STAGE,
        }
    }
}

impl FunnelSettings {
    pub fn with_override(mut self, domain: impl Into<String>, count: usize) -> Self {
        self.domain_overrides.insert(domain.into(), count);
        self
    }
}

/// Per-label counts in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCounts {
    entries: Vec<(Label, usize)>,
}

impl StageCounts {
    pub fn increment(&mut self, label: Label) {
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((label, 1)),
        }
    }

    /// Count for a label, zero when the label never occurred.
    pub fn get(&self, label: Label) -> usize {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map_or(0, |(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Labels in first-seen order, then unseen labels in canonical order.
    fn ordered_labels(&self) -> Vec<Label> {
        let mut labels: Vec<Label> = self.entries.iter().map(|(l, _)| *l).collect();
        for label in Label::CANONICAL {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Funnel {
    /// Stage rows followed by the synthetic ghosted row.
    pub rows: Vec<FunnelRow>,
    pub counts: StageCounts,
    /// Emails left after the self-address filter.
    pub total_emails: usize,
    pub self_excluded: usize,
    /// Emails no keyword matched.
    pub fallback_emails: usize,
    pub ghosted: usize,
    pub companies_interviewed: usize,
    pub per_domain: Vec<DomainInterviews>,
    pub interview_stages: Vec<InterviewStageRow>,
}

/// Aggregate classified emails and meetings into a funnel.
pub fn build_funnel(
    classified: &[ClassifiedEmail],
    meetings: &[MeetingRecord],
    self_address: &str,
    settings: &FunnelSettings,
) -> Funnel {
    let mut counts = StageCounts::default();
    let mut self_excluded = 0;
    let mut fallback_emails = 0;

    for email in classified {
        if is_self_address(email.sender(), self_address) {
            self_excluded += 1;
            continue;
        }
        if email.source == ClassificationSource::Fallback {
            fallback_emails += 1;
        }
        counts.increment(email.classification);
    }

    if self_excluded > 0 {
        debug!(self_excluded, "Excluded self-authored emails");
    }

    let per_domain = interviews_per_domain(meetings, &settings.domain_overrides);
    let companies_interviewed = per_domain.len();

    let ghosted = counts
        .get(Label::ApplicationConfirmation)
        .saturating_sub(counts.get(Label::JobFilled))
        .saturating_sub(companies_interviewed);

    let mut rows: Vec<FunnelRow> = counts
        .ordered_labels()
        .into_iter()
        .map(|label| FunnelRow::new(label.as_str(), counts.get(label)))
        .collect();
    rows.push(FunnelRow::new(GHOSTED_STAGE, ghosted));

    let interview_stages = interview_stage_distribution(&per_domain, settings.max_interview_stage);

    info!(
        emails = counts.total(),
        companies = companies_interviewed,
        ghosted,
        "Built funnel"
    );

    Funnel {
        rows,
        total_emails: counts.total(),
        counts,
        self_excluded,
        fallback_emails,
        ghosted,
        companies_interviewed,
        per_domain,
        interview_stages,
    }
}

/// Meetings per domain in first-seen order, with overrides applied to
/// domains that had at least one meeting.
pub fn interviews_per_domain(
    meetings: &[MeetingRecord],
    overrides: &BTreeMap<String, usize>,
) -> Vec<DomainInterviews> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut per_domain: Vec<DomainInterviews> = Vec::new();

    for meeting in meetings {
        match index.get(meeting.domain.as_str()) {
            Some(&i) => per_domain[i].interviews += 1,
            None => {
                index.insert(meeting.domain.as_str(), per_domain.len());
                per_domain.push(DomainInterviews {
                    domain: meeting.domain.clone(),
                    interviews: 1,
                });
            }
        }
    }

    for entry in &mut per_domain {
        if let Some(&forced) = overrides.get(&entry.domain) {
            debug!(
                domain = %entry.domain,
                actual = entry.interviews,
                forced,
                "Applying interview count override"
            );
            entry.interviews = forced;
        }
    }

    per_domain
}

/// Number of domains per interview-stage count, ascending, excluding
/// counts at or above `max_interview_stage`.
pub fn interview_stage_distribution(
    per_domain: &[DomainInterviews],
    max_interview_stage: usize,
) -> Vec<InterviewStageRow> {
    let mut by_stage: BTreeMap<usize, usize> = BTreeMap::new();
    for entry in per_domain {
        *by_stage.entry(entry.interviews).or_default() += 1;
    }

    by_stage
        .into_iter()
        .filter(|(stage, _)| *stage < max_interview_stage)
        .map(|(interview_stage, domains)| InterviewStageRow {
            interview_stage,
            no_interviews_per_stage: domains,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::EmailRecord;

    fn classified(id: &str, sender: &str, label: Label) -> ClassifiedEmail {
        ClassifiedEmail {
            record: EmailRecord::new(id, sender),
            classification: label,
            source: ClassificationSource::Keyword,
        }
    }

    fn meeting(id: &str, domain: &str) -> MeetingRecord {
        MeetingRecord {
            record: EmailRecord::new(id, format!("recruiter@{domain}")),
            domain: domain.to_string(),
        }
    }

    fn sample() -> Vec<ClassifiedEmail> {
        vec![
            classified("1", "a@x.com", Label::Reject),
            classified("2", "b@y.com", Label::ApplicationConfirmation),
            classified("3", "c@z.com", Label::JobFilled),
            classified("4", "d@w.com", Label::ApplicationConfirmation),
            classified("5", "e@v.com", Label::ApplicationConfirmation),
            classified("6", "f@u.com", Label::Reject),
        ]
    }

    #[test]
    fn counts_sum_to_total_after_self_filter() {
        let mut emails = sample();
        emails.push(classified("7", "me@home.com", Label::Reject));
        let funnel = build_funnel(&emails, &[], "me@home.com", &FunnelSettings::default());

        assert_eq!(funnel.self_excluded, 1);
        assert_eq!(funnel.total_emails, 6);
        let stage_sum: usize = Label::CANONICAL
            .into_iter()
            .map(|l| funnel.counts.get(l))
            .sum();
        assert_eq!(stage_sum, funnel.total_emails);
        assert_eq!(funnel.counts.get(Label::Reject), 2);
    }

    #[test]
    fn ghosted_uses_label_lookup() {
        let meetings = vec![meeting("m1", "acme.com")];
        let funnel = build_funnel(&sample(), &meetings, "", &FunnelSettings::default());
        // 3 confirmations - 1 filled - 1 company
        assert_eq!(funnel.ghosted, 1);
        assert_eq!(funnel.rows.last(), Some(&FunnelRow::new("ghosted", 1)));
    }

    #[test]
    fn ghosted_is_invariant_under_permutation() {
        let meetings = vec![meeting("m1", "acme.com"), meeting("m2", "beta.io")];
        let settings = FunnelSettings::default();
        let forward = build_funnel(&sample(), &meetings, "", &settings);

        let mut reversed = sample();
        reversed.reverse();
        let mut meetings_rev = meetings.clone();
        meetings_rev.reverse();
        let backward = build_funnel(&reversed, &meetings_rev, "", &settings);

        let mut rotated = sample();
        rotated.rotate_left(2);
        let rotated = build_funnel(&rotated, &meetings, "", &settings);

        assert_eq!(forward.ghosted, backward.ghosted);
        assert_eq!(forward.ghosted, rotated.ghosted);
        assert_eq!(forward.counts.get(Label::Reject), backward.counts.get(Label::Reject));
    }

    #[test]
    fn rows_follow_first_seen_order() {
        let funnel = build_funnel(&sample(), &[], "", &FunnelSettings::default());
        let stages: Vec<&str> = funnel.rows.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(
            stages,
            ["reject", "application_confirmation", "job_filled", "ghosted"]
        );
    }

    #[test]
    fn empty_input_yields_zero_rows() {
        let funnel = build_funnel(&[], &[], "me@home.com", &FunnelSettings::default());
        assert_eq!(
            funnel.rows,
            vec![
                FunnelRow::new("application_confirmation", 0),
                FunnelRow::new("job_filled", 0),
                FunnelRow::new("reject", 0),
                FunnelRow::new("ghosted", 0),
            ]
        );
        assert_eq!(funnel.companies_interviewed, 0);
        assert!(funnel.interview_stages.is_empty());
    }

    #[test]
    fn ghosted_never_goes_negative() {
        let emails = vec![classified("1", "a@x.com", Label::ApplicationConfirmation)];
        let meetings = vec![meeting("m1", "acme.com"), meeting("m2", "beta.io")];
        let funnel = build_funnel(&emails, &meetings, "", &FunnelSettings::default());
        assert_eq!(funnel.ghosted, 0);
    }

    #[test]
    fn companies_count_distinct_domains() {
        let meetings = vec![
            meeting("m1", "acme.com"),
            meeting("m2", "acme.com"),
            meeting("m3", "acme.com"),
            meeting("m4", "beta.io"),
        ];
        let per_domain = interviews_per_domain(&meetings, &BTreeMap::new());
        assert_eq!(
            per_domain,
            vec![
                DomainInterviews { domain: "acme.com".into(), interviews: 3 },
                DomainInterviews { domain: "beta.io".into(), interviews: 1 },
            ]
        );
    }

    #[test]
    fn override_forces_domain_count() {
        let meetings = vec![meeting("m1", "voxelai.com"), meeting("m2", "acme.com")];
        let settings = FunnelSettings::default().with_override("voxelai.com", 7);
        let funnel = build_funnel(&[], &meetings, "", &settings);

        let voxel = funnel
            .per_domain
            .iter()
            .find(|d| d.domain == "voxelai.com")
            .unwrap();
        assert_eq!(voxel.interviews, 7);
        // The override changes stage depth, not the number of companies.
        assert_eq!(funnel.companies_interviewed, 2);
    }

    #[test]
    fn override_ignored_for_absent_domain() {
        let meetings = vec![meeting("m1", "acme.com")];
        let settings = FunnelSettings::default().with_override("voxelai.com", 7);
        let funnel = build_funnel(&[], &meetings, "", &settings);
        assert_eq!(funnel.per_domain.len(), 1);
        assert_eq!(funnel.companies_interviewed, 1);
    }

    #[test]
    fn distribution_excludes_outliers() {
        let per_domain = vec![
            DomainInterviews { domain: "a.com".into(), interviews: 1 },
            DomainInterviews { domain: "b.com".into(), interviews: 3 },
            DomainInterviews { domain: "c.com".into(), interviews: 1 },
            DomainInterviews { domain: "d.com".into(), interviews: 9 },
            DomainInterviews { domain: "e.com".into(), interviews: 12 },
        ];
        let rows = interview_stage_distribution(&per_domain, DEFAULT_MAX_INTERVIEW_STAGE);
        assert_eq!(
            rows,
            vec![
                InterviewStageRow { interview_stage: 1, no_interviews_per_stage: 2 },
                InterviewStageRow { interview_stage: 3, no_interviews_per_stage: 1 },
            ]
        );
    }

    #[test]
    fn fallback_emails_are_counted() {
        let mut emails = sample();
        emails[1].source = ClassificationSource::Fallback;
        emails.push(ClassifiedEmail {
            source: ClassificationSource::Fallback,
            ..classified("9", "me@home.com", Label::ApplicationConfirmation)
        });
        let funnel = build_funnel(&emails, &[], "me@home.com", &FunnelSettings::default());
        // The self-authored fallback is filtered before counting.
        assert_eq!(funnel.fallback_emails, 1);
    }
}
