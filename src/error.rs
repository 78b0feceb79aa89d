use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::domain::ErrorEnvelope;
use crate::storage::StorageError;

/// The error taxonomy for the whole API surface. Every variant renders as
/// the uniform `{error, message, detail?, timestamp}` envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad input shape, type, or size on a request. Never retried.
    #[error("{0}")]
    Validation(String),

    /// The upload exceeds the size ceiling.
    #[error("{0}")]
    TooLarge(String),

    /// The requested document or resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// No text could be recovered from the document. Terminal.
    #[error("{0}")]
    Extraction(String),

    /// The language model returned output that does not match the expected
    /// structure.
    #[error("{0}")]
    Unprocessable(String),

    /// A third-party API call failed or timed out. The caller may retry.
    #[error("{0}")]
    Upstream(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Auth(String),

    /// Too many requests from one address inside the current window.
    #[error("{0}")]
    RateLimited(String),

    /// Persistence failed (database or blob store).
    #[error("{0}")]
    Storage(String),

    #[error("an unexpected internal error occurred")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        ApiError::Storage(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Extraction(_) | ApiError::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::Unprocessable(_) => "validation_error",
            ApiError::TooLarge(_) => "file_too_large",
            ApiError::NotFound(_) => "not_found",
            ApiError::Extraction(_) => "extraction_error",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Auth(_) => "unauthorized",
            ApiError::RateLimited(_) => "rate_limited",
            ApiError::Storage(_) => "storage_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let detail = match self {
            ApiError::Extraction(_) => Some(
                "The document may be scanned at low quality or empty. Try uploading a \
                 clearer copy or a text-based version."
                    .to_string(),
            ),
            ApiError::Internal(err) => Some(err.to_string()),
            _ => None,
        };
        ErrorEnvelope {
            error: self.tag().to_string(),
            message: self.to_string(),
            detail,
            timestamp: Utc::now(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {} ({})", self, self.tag());
        } else {
            tracing::debug!("request rejected: {} ({})", self, self.tag());
        }
        (status, Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::TooLarge("big".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Extraction("none".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Storage("db".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = ApiError::NotFound("document not found".into()).envelope();
        assert_eq!(envelope.error, "not_found");
        assert_eq!(envelope.message, "document not found");
        assert!(envelope.detail.is_none());
    }

    #[test]
    fn test_extraction_envelope_carries_guidance() {
        let envelope = ApiError::Extraction("no text recovered".into()).envelope();
        assert!(envelope.detail.unwrap().contains("clearer copy"));
    }
}
