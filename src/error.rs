//! Error types for the job funnel.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mail source error: {0}")]
    Source(#[from] SourceError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading records from a mail source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid record in {path} at line {line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },
}

/// Errors raised while writing a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A sender address without a domain part.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed sender address (no domain): {sender:?}")]
pub struct MalformedSenderError {
    pub sender: String,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
