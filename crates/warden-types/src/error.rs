use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by a CI data source (repository, workflow, and run queries).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataSourceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limit exhausted (resets at {})", reset_display(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("invalid response: {0}")]
    Invalid(String),

    #[error("request cancelled")]
    Cancelled,
}

impl DataSourceError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Rate limiting is deliberately excluded: once the provider starts
    /// rejecting requests the pass stops instead of hammering it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transient(_))
    }
}

fn reset_display(reset_at: &Option<DateTime<Utc>>) -> String {
    reset_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Errors from the file-backed stores (manifest, backups, audit log, reports).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {message}")]
    Serialize { what: String, message: String },

    #[error("corrupt data in {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Errors from the remote mutation boundary (disabling/enabling a workflow
/// on the CI provider itself).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote rejected {operation} for {repository}/{path}: {message}")]
    Rejected {
        operation: String,
        repository: String,
        path: String,
        message: String,
    },
}
