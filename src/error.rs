//! Error types for concord.

use thiserror::Error;

/// Result type for concord operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for concord operations.
///
/// Only setup-time failures surface as errors: invalid configuration,
/// malformed inclusion rules, an agreement measure that cannot be applied
/// to the configured rater set. Per-document problems (token mismatches,
/// unresolvable spans) are not errors — they skip the document and are
/// reported as [`SkipReason`](crate::engine::SkipReason).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Inclusion-rule source could not be read or parsed.
    #[error("Inclusion rules: {0}")]
    InclusionRules(String),

    /// Unknown name passed to a `FromStr` impl (measure, strategy, kind).
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error (inclusion-rule files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (inclusion-rule sources).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an inclusion-rule error.
    pub fn inclusion_rules(msg: impl Into<String>) -> Self {
        Error::InclusionRules(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }
}
