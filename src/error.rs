use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Every failure the sync pipeline can surface. Nothing here is retried
/// locally; callers re-run the whole operation once the cause is fixed.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Non-success status or an `errors` payload from any API call.
    #[error("upstream error ({context}): http {status}: {body}")]
    Upstream {
        context: String,
        status: u16,
        body: String,
    },

    #[error("daily limit reached, no requests left today (daily limit is {daily_limit})")]
    QuotaExceeded { daily_limit: u64 },

    #[error(
        "quota floor triggered: {remaining} requests left (floor {floor}); re-run with the floor bypass to continue"
    )]
    SafetyMargin { remaining: u64, floor: u64 },

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("unknown match status {status:?} for fixture {fixture_id}")]
    UnknownMatchStatus { fixture_id: u64, status: String },

    #[error(
        "two captures of {identifier}/{file_name} share timestamp {timestamp}: {} and {}",
        first.display(),
        second.display()
    )]
    SnapshotConflict {
        identifier: String,
        file_name: String,
        timestamp: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("malformed capture {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SyncError::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }
}
