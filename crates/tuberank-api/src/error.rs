//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use tuberank_youtube::YouTubeError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] tuberank_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] tuberank_queue::QueueError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Queue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Quota and upstream exhaustion surface as 503, validation and absence
/// as their 4xx, everything unclassified as 500.
impl From<YouTubeError> for ApiError {
    fn from(e: YouTubeError) -> Self {
        match e {
            YouTubeError::QuotaExceeded(msg) | YouTubeError::RateLimited(msg) => {
                ApiError::ServiceUnavailable(msg)
            }
            YouTubeError::Upstream5xx { status } => {
                ApiError::ServiceUnavailable(format!("upstream returned {}", status))
            }
            YouTubeError::NotFound(msg) => ApiError::NotFound(msg),
            YouTubeError::Upstream4xx { status, message } => {
                ApiError::BadRequest(format!("upstream rejected request ({}): {}", status, message))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Queue(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse { detail };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_exhaustion_maps_to_503() {
        let e: ApiError = YouTubeError::rate_limited("throttled").into();
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let e: ApiError = YouTubeError::quota_exceeded("daily budget").into();
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let e: ApiError = YouTubeError::Upstream5xx { status: 502 }.into();
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let e: ApiError = YouTubeError::not_found("channel").into();
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unclassified_maps_to_500() {
        let e: ApiError = YouTubeError::parse("bad json").into();
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
