/// Error taxonomy for the report run.
///
/// A balance read ends in one of three ways: a value, a transient upstream
/// failure worth retrying, or a terminal failure for that one address. The
/// retry policy pattern-matches on `ReadError` instead of catching by
/// exception type.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    /// Network-level or availability failure of the upstream indexer.
    /// Subject to bounded backoff in `retry::RetryPolicy`.
    #[error("transient indexer failure: {0}")]
    Retryable(String),

    /// Anything else during one address's read (malformed address,
    /// unexpected upstream response shape). Written to the error ledger;
    /// never aborts the run.
    #[error("{0}")]
    Fatal(String),
}

impl ReadError {
    pub fn retryable(err: impl std::fmt::Display) -> Self {
        ReadError::Retryable(err.to_string())
    }

    pub fn fatal(err: impl std::fmt::Display) -> Self {
        ReadError::Fatal(err.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ReadError::Retryable(_))
    }
}

impl From<reqwest::Error> for ReadError {
    fn from(err: reqwest::Error) -> Self {
        ReadError::Retryable(err.to_string())
    }
}

/// Pre-loop configuration failures. These abort the run before any client
/// is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting '{0}'")]
    MissingSetting(&'static str),

    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("Settings file not found: {0}")]
    FileNotFound(String),
}
