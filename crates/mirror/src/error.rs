use reqwest::StatusCode;

use crate::cache::CacheKey;

/// Errors raised while fetching release metadata from the upstream feed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status code {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed release metadata: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(String),
}

/// A rejected path component (version tag or asset name).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} contains a path traversal sequence: {value:?}")]
    Traversal { field: &'static str, value: String },

    #[error("{field} contains a path separator or control byte: {value:?}")]
    Separator { field: &'static str, value: String },

    #[error("{field} uses a reserved name: {value:?}")]
    Reserved { field: &'static str, value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Download of {key} failed: {reason}")]
    DownloadFailed { key: CacheKey, reason: String },
}

impl CacheError {
    pub(crate) fn download_failed(key: &CacheKey, reason: impl ToString) -> Self {
        CacheError::DownloadFailed {
            key: key.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a rejected download request, mapped onto HTTP status codes by the server.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("{0}")]
    BadRequest(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to fetch asset: {0}")]
    Internal(#[source] CacheError),
}

/// Errors raised by the notification ingester before any work is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("only POST is supported")]
    MethodNotAllowed,

    #[error("signature verification failed")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),
}
