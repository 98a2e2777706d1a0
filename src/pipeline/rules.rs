//! Keyword rules for classifying application emails.
//!
//! Classification is substring matching over the lower-cased body:
//! - every label whose keyword list hits becomes a candidate
//! - candidates collapse to one label via `Label::PRIORITY`
//! - no body at all → application confirmation, before any matching
//! - no candidates → application confirmation (still pending)
//!
//! Matching is not tokenized. Short keywords such as `"if"` or `"review"`
//! hit inside unrelated words and sentences; the default ruleset keeps them
//! so reports stay comparable across runs, but they are known to
//! over-match and need tuning.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::pipeline::types::{ClassificationSource, ClassifiedEmail, EmailRecord, Label};

/// Trigger phrases per label.
///
/// Phrases are stored lower-cased, trimmed and de-duplicated, in the order
/// they were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordRuleset {
    keywords: BTreeMap<Label, Vec<String>>,
}

impl KeywordRuleset {
    /// Create an empty ruleset (for testing).
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in keyword lists.
    pub fn default_rules() -> Self {
        Self::new()
            .with_keywords(
                Label::ApplicationConfirmation,
                [
                    "received",
                    "we contact you",
                    "we will review",
                    "review",
                    "reviewing",
                    "submitted successfully",
                    "thank you for applying",
                    "thanks for applying",
                    "submit your application",
                    "If",
                    "get back to you",
                    "will be in touch",
                    "high volume",
                    "be in touch",
                ],
            )
            .with_keywords(Label::JobFilled, ["position filled", "no longer hiring"])
            .with_keywords(
                Label::Reject,
                [
                    "move forward with other candidates",
                    "not move forward with your application",
                    "not to move forward",
                    "not your candidacy",
                    "canidate",
                    "not be moving forward",
                    "unfortunately",
                    "other candidates",
                    "experience align more closely",
                    "appreciate the time and effort",
                ],
            )
    }

    /// Parse a ruleset from a JSON object of `label -> [phrases]`.
    ///
    /// Labels missing from the object get no keywords.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<Label, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| ConfigError::ParseError(format!("keyword ruleset: {e}")))?;

        Ok(raw
            .into_iter()
            .fold(Self::new(), |rules, (label, phrases)| {
                rules.with_keywords(label, phrases)
            }))
    }

    /// Load a ruleset from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Add phrases for a label, keeping earlier phrases first.
    pub fn with_keywords<I, S>(mut self, label: Label, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.keywords.entry(label).or_default();
        for phrase in phrases {
            let phrase = phrase.as_ref().trim().to_lowercase();
            if phrase.is_empty() || entry.contains(&phrase) {
                continue;
            }
            entry.push(phrase);
        }
        self
    }

    /// Phrases configured for a label.
    pub fn keywords(&self, label: Label) -> &[String] {
        self.keywords.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any phrase of `label` occurs in an already lower-cased body.
    fn matches(&self, label: Label, lowered_body: &str) -> bool {
        self.keywords(label)
            .iter()
            .any(|phrase| lowered_body.contains(phrase.as_str()))
    }
}

/// Keyword classifier over an injected ruleset.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: KeywordRuleset,
}

impl Classifier {
    pub fn new(rules: KeywordRuleset) -> Self {
        Self { rules }
    }

    /// All labels with at least one matching phrase, in priority order.
    pub fn candidates(&self, body: &str) -> Vec<Label> {
        let lowered = body.to_lowercase();
        Label::PRIORITY
            .into_iter()
            .filter(|label| self.rules.matches(*label, &lowered))
            .collect()
    }

    /// Collapse a candidate set to the highest-priority label.
    ///
    /// Returns `None` for an empty set; callers substitute `Label::DEFAULT`.
    pub fn resolve(candidates: &[Label]) -> Option<Label> {
        Label::PRIORITY
            .into_iter()
            .find(|label| candidates.contains(label))
    }

    /// Classify a body, reporting how the label was reached.
    pub fn classify_with_source(&self, body: Option<&str>) -> (Label, ClassificationSource) {
        let Some(body) = body else {
            return (Label::DEFAULT, ClassificationSource::MissingBody);
        };

        match Self::resolve(&self.candidates(body)) {
            Some(label) => (label, ClassificationSource::Keyword),
            None => (Label::DEFAULT, ClassificationSource::Fallback),
        }
    }

    /// Classify a body into a single label.
    pub fn classify(&self, body: Option<&str>) -> Label {
        self.classify_with_source(body).0
    }

    /// Classify a fetched record.
    pub fn evaluate(&self, record: EmailRecord) -> ClassifiedEmail {
        let (classification, source) = self.classify_with_source(record.body.as_deref());
        debug!(
            message_id = %record.message_id,
            sender = %record.sender,
            label = classification.as_str(),
            source = ?source,
            "Classified email"
        );
        ClassifiedEmail {
            record,
            classification,
            source,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(KeywordRuleset::default_rules())
    }
}
