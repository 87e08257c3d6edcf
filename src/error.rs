//! Error taxonomy for a sync run.
//!
//! Only fatal conditions surface as `SyncError`. Per-item submission problems
//! are folded into `SubmissionResult` values and never abort a run.
use thiserror::Error;

use crate::config::ConfigError;

/// Failure while paging through the content source. Always fatal.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to reach content source: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("content source returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid content source response: {0}")]
    Decode(String),
    #[error("invalid base URL {0}")]
    InvalidUrl(String),
}

/// Transport-level failure of a single downstream request (no HTTP response).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// Errors that abort a run before or during fetching.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("fetching '{content_type}' entries failed: {source}")]
    Fetch {
        content_type: String,
        #[source]
        source: SourceError,
    },
    #[error("publish server preflight failed: {0}")]
    Preflight(String),
    #[error("unknown entry kind '{0}'")]
    UnknownKind(String),
}
