//! File-backed mail source: one JSON record per line.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SourceError;
use crate::pipeline::types::EmailRecord;
use crate::source::{MailQuery, MailSource, QueryKind};

/// Reads application and meeting records from two JSONL files.
#[derive(Debug, Clone)]
pub struct JsonlMailSource {
    applications_path: PathBuf,
    meetings_path: PathBuf,
}

impl JsonlMailSource {
    pub fn new(applications_path: impl Into<PathBuf>, meetings_path: impl Into<PathBuf>) -> Self {
        Self {
            applications_path: applications_path.into(),
            meetings_path: meetings_path.into(),
        }
    }

    fn path_for(&self, kind: QueryKind) -> &Path {
        match kind {
            QueryKind::Applications => &self.applications_path,
            QueryKind::Meetings => &self.meetings_path,
        }
    }
}

impl MailSource for JsonlMailSource {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn fetch(&self, query: &MailQuery) -> Result<Vec<EmailRecord>, SourceError> {
        let path = self.path_for(query.kind);
        let records = load_records(path)?;
        let total = records.len();

        let mut seen: HashSet<String> = HashSet::new();
        let mut admitted = Vec::with_capacity(total);
        for record in records {
            if !query.admits(&record) {
                continue;
            }
            if !seen.insert(record.message_id.clone()) {
                warn!(message_id = %record.message_id, "Duplicate message ID, keeping first");
                continue;
            }
            admitted.push(record);
        }

        debug!(
            path = %path.display(),
            total,
            admitted = admitted.len(),
            "Loaded records"
        );
        Ok(admitted)
    }
}

/// Parse every non-blank line of a JSONL file into a record.
pub fn load_records(path: &Path) -> Result<Vec<EmailRecord>, SourceError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|e| SourceError::Read {
        path: display.clone(),
        reason: e.to_string(),
    })?;

    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| SourceError::Read {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let record: EmailRecord = serde_json::from_str(&line).map_err(|e| SourceError::Parse {
            path: display.clone(),
            line: i + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(records)
}
