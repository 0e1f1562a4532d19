use axum::Json;
use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mirror_engine::{DomainsError, DownloadError, IngestError};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::models::ErrorResponse;

/// Every failed request renders as `{"error": "<message>"}` with the matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// An extractor refused the request before the handler ran
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream { status, .. } | ApiError::Rejected { status, .. } => *status,
        }
    }

    pub fn version_unavailable() -> Self {
        ApiError::ServiceUnavailable("version information unavailable".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DownloadError> for ApiError {
    fn from(e: DownloadError) -> Self {
        match e {
            DownloadError::BadRequest(e) => {
                debug!(error = %e, "Invalid download path");
                ApiError::BadRequest(format!("invalid path: {e}"))
            }
            DownloadError::NotFound(message) => ApiError::NotFound(message),
            DownloadError::Internal(_) => ApiError::Internal("failed to download file".to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::MethodNotAllowed => ApiError::MethodNotAllowed,
            IngestError::Unauthorized => ApiError::Unauthorized("invalid signature".to_string()),
            IngestError::BadRequest(message) => ApiError::BadRequest(message),
        }
    }
}

impl From<DomainsError> for ApiError {
    fn from(e: DomainsError) -> Self {
        match e {
            DomainsError::NotConfigured => ApiError::Internal(e.to_string()),
            DomainsError::Connect(_) => {
                warn!(error = %e, "Domains upstream unreachable");
                ApiError::BadGateway("failed to reach upstream".to_string())
            }
            DomainsError::Upstream { status, .. } => ApiError::Upstream {
                status,
                message: e.to_string(),
            },
            DomainsError::Decode(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        debug!(error = %e, "Rejected path parameters");
        ApiError::Rejected {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        debug!(error = %e, "Rejected query string");
        ApiError::Rejected {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(e: BytesRejection) -> Self {
        debug!(error = %e, "Rejected request body");
        ApiError::Rejected {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_engine::ValidationError;

    #[test]
    fn engine_errors_map_to_statuses() {
        let bad = ApiError::from(DownloadError::BadRequest(ValidationError::Empty("file name")));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(DownloadError::NotFound("version not found".to_string()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "version not found");

        assert_eq!(
            ApiError::from(IngestError::Unauthorized).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(IngestError::MethodNotAllowed).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let upstream = ApiError::from(DomainsError::Upstream {
            status: StatusCode::FORBIDDEN,
            body: "rate limited".to_string(),
        });
        assert_eq!(upstream.status(), StatusCode::FORBIDDEN);
        assert!(upstream.to_string().contains("rate limited"));
        assert_eq!(
            ApiError::from(DomainsError::NotConfigured).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rejections_keep_their_status() {
        let rejected = ApiError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".to_string(),
        };
        assert_eq!(rejected.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(rejected.to_string(), "length limit exceeded");
    }
}
