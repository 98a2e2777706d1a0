//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::ConfigError;
use crate::pipeline::funnel::{DEFAULT_MAX_INTERVIEW_STAGE, FunnelSettings};
use crate::pipeline::rules::KeywordRuleset;

/// Output format for the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "table" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: "FUNNEL_REPORT_FORMAT".into(),
                message: format!("expected `text` or `json`, got `{other}`"),
            }),
        }
    }
}

/// Funnel run configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct FunnelConfig {
    /// The account's own address; its mail is excluded from the funnel.
    pub self_address: String,
    pub applications_path: PathBuf,
    pub meetings_path: PathBuf,
    /// Only records received on or after this date are considered.
    pub after: Option<NaiveDate>,
    pub domain_overrides: BTreeMap<String, usize>,
    pub max_interview_stage: usize,
    /// Custom keyword ruleset; the built-in one is used when unset.
    pub keywords_path: Option<PathBuf>,
    pub report_format: ReportFormat,
    /// Report destination; stdout when unset.
    pub output_path: Option<PathBuf>,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            self_address: String::new(),
            applications_path: PathBuf::from("job_application_emails.jsonl"),
            meetings_path: PathBuf::from("calendar_meetings.jsonl"),
            after: None,
            domain_overrides: BTreeMap::new(),
            max_interview_stage: DEFAULT_MAX_INTERVIEW_STAGE,
            keywords_path: None,
            report_format: ReportFormat::Text,
            output_path: None,
        }
    }
}

impl FunnelConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let self_address = get("FUNNEL_SELF_ADDRESS")
            .or_else(|| get("MY_EMAIL"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let after = get("FUNNEL_AFTER")
            .map(|s| parse_date("FUNNEL_AFTER", &s))
            .transpose()?;

        let domain_overrides = get("FUNNEL_DOMAIN_OVERRIDES")
            .map(|s| parse_overrides(&s))
            .transpose()?
            .unwrap_or_default();

        let max_interview_stage = get("FUNNEL_MAX_INTERVIEW_STAGE")
            .map(|s| {
                s.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                    key: "FUNNEL_MAX_INTERVIEW_STAGE".into(),
                    message: e.to_string(),
                })
            })
            .transpose()?
            .unwrap_or(defaults.max_interview_stage);

        let report_format = get("FUNNEL_REPORT_FORMAT")
            .map(|s| s.parse::<ReportFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            self_address,
            applications_path: get("FUNNEL_APPLICATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.applications_path),
            meetings_path: get("FUNNEL_MEETINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.meetings_path),
            after,
            domain_overrides,
            max_interview_stage,
            keywords_path: get("FUNNEL_KEYWORDS_PATH").map(PathBuf::from),
            report_format,
            output_path: get("FUNNEL_OUTPUT_PATH").map(PathBuf::from),
        })
    }

    /// Aggregation settings for the funnel.
    pub fn funnel_settings(&self) -> FunnelSettings {
        FunnelSettings {
            domain_overrides: self.domain_overrides.clone(),
            max_interview_stage: self.max_interview_stage,
        }
    }

    /// The configured keyword ruleset, or the built-in one.
    pub fn keyword_ruleset(&self) -> Result<KeywordRuleset, ConfigError> {
        match &self.keywords_path {
            Some(path) => KeywordRuleset::from_path(path),
            None => Ok(KeywordRuleset::default_rules()),
        }
    }
}

/// Parse `YYYY-MM-DD` or `YYYY/MM/DD`.
fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .map_err(|e| ConfigError::InvalidValue {
            key: key.into(),
            message: format!("`{value}`: {e}"),
        })
}

/// Parse `domain=count` pairs separated by commas.
pub fn parse_overrides(value: &str) -> Result<BTreeMap<String, usize>, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "FUNNEL_DOMAIN_OVERRIDES".into(),
        message,
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (domain, count) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected `domain=count`, got `{pair}`")))?;
            let domain = domain.trim();
            if domain.is_empty() {
                return Err(invalid(format!("empty domain in `{pair}`")));
            }
            let count = count
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(format!("`{pair}`: {e}")))?;
            Ok((domain.to_string(), count))
        })
        .collect()
}
