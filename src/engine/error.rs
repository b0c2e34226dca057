//! Item-level and run-level error types for the fetch scheduler.

use thiserror::Error;

use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::link::LinkError;
use crate::payload::PayloadError;
use crate::record::FailureKind;

/// Why a single item failed.
///
/// The `Display` output is the record's `error_reason` and is kept short and
/// stable so it can be shown per row as-is.
#[derive(Debug, Clone, Error)]
pub enum ItemError {
    /// The link was unrecognized or its redirect could not be followed.
    #[error("invalid link: {0}")]
    InvalidLink(#[source] LinkError),

    /// The metadata request timed out on every attempt.
    #[error("request timed out")]
    Timeout,

    /// The metadata request failed at the connection level on every attempt.
    #[error("connection error")]
    Connection,

    /// The metadata endpoint answered with a non-2xx status.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// The metadata page could not be parsed.
    #[error("parse failure: malformed or empty payload")]
    Parse(#[source] PayloadError),

    /// The run was cancelled before the item settled.
    #[error("cancelled")]
    Cancelled,

    /// The pipeline task panicked or was aborted.
    #[error("internal error: pipeline task failed")]
    Internal,
}

impl ItemError {
    /// Returns the summary category of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidLink(_) => FailureKind::InvalidLink,
            Self::Timeout => FailureKind::Timeout,
            Self::Connection => FailureKind::ConnectionError,
            Self::HttpStatus(code) => FailureKind::HttpStatus(*code),
            Self::Parse(_) => FailureKind::ParseFailure,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Internal => FailureKind::Internal,
        }
    }
}

impl From<LinkError> for ItemError {
    fn from(error: LinkError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::InvalidLink(error)
        }
    }
}

impl From<FetchError> for ItemError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Timeout { .. } => Self::Timeout,
            FetchError::Connection { .. } => Self::Connection,
            FetchError::HttpStatus { status, .. } => Self::HttpStatus(status),
            FetchError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<PayloadError> for ItemError {
    fn from(error: PayloadError) -> Self {
        Self::Parse(error)
    }
}

/// Errors that reject a whole run. Item failures never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The run configuration is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}
