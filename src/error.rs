use thiserror::Error;

use crate::dns::{Name, ParseError};

/// Failure of a single lookup. Every variant is fatal to the `resolve` call
/// that produced it; no partial chain is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProveError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No root key matches a trust anchor for {zone}")]
    TrustAnchorMismatch { zone: Name },

    #[error("No matching key for {zone}: {detail}")]
    NoMatchingKey { zone: Name, detail: String },

    #[error("NSEC records do not prove non-existence of {name}")]
    AmbiguousDenial { name: Name },

    #[error("Lookup cancelled")]
    Cancelled,
}

impl From<ParseError> for ProveError {
    fn from(err: ParseError) -> Self {
        ProveError::MalformedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProveError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors reported by an oracle client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Oracle rejected proof: {0}")]
    Rejected(String),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Lookup result cannot be retracted: {0}")]
    NotRetractable(String),
}

/// Submission failure, carrying the index of the proof that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Submitting proof {index} failed: {source}")]
pub struct SubmitError {
    pub index: usize,
    pub source: OracleError,
}
