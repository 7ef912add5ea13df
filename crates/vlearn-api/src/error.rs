//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vlearn_ingest::IngestError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    /// A dependency (YouTube, transcript sources, Gemini) failed.
    #[error("Upstream failure during {step}: {detail}")]
    UpstreamUnavailable { step: &'static str, detail: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Firestore error: {0}")]
    Firestore(vlearn_firestore::FirestoreError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) | ApiError::Firestore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<vlearn_firestore::FirestoreError> for ApiError {
    fn from(e: vlearn_firestore::FirestoreError) -> Self {
        use vlearn_firestore::FirestoreError;
        match e {
            // A missing entry document means the video is not in the
            // caller's library
            FirestoreError::NotFound(_) => {
                ApiError::NotFound("Video not found in your library".to_string())
            }
            FirestoreError::AlreadyExists(msg) => ApiError::Conflict(msg),
            other => ApiError::Firestore(other),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::InvalidUrl(err) => ApiError::BadRequest(err.to_string()),
            IngestError::VideoNotFound(msg) => ApiError::NotFound(msg),
            IngestError::Store(err) => ApiError::from(err),
            IngestError::Config(msg) => ApiError::Internal(msg),
            other => ApiError::UpstreamUnavailable {
                step: other.step(),
                detail: other.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Firestore(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let step = match &self {
            ApiError::UpstreamUnavailable { step, .. } => Some(*step),
            _ => None,
        };

        let body = ErrorResponse { detail, step };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_mapping() {
        let e: ApiError = IngestError::transcript("all sources exhausted").into();
        assert!(matches!(
            e,
            ApiError::UpstreamUnavailable {
                step: "transcript",
                ..
            }
        ));
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);

        let e: ApiError = IngestError::VideoNotFound("x".to_string()).into();
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);

        let e: ApiError =
            IngestError::InvalidUrl(vlearn_models::VideoUrlError::UnsupportedSource).into();
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_store_document_maps_to_not_found() {
        use vlearn_firestore::FirestoreError;

        let e: ApiError = FirestoreError::not_found("users/u/videos/abc123").into();
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);

        // The same mapping applies when the store error arrives wrapped
        let e: ApiError =
            IngestError::Store(FirestoreError::not_found("users/u/videos/abc123")).into();
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);

        let e: ApiError = FirestoreError::AlreadyExists("users/u/videos/abc123".into()).into();
        assert_eq!(e.status_code(), StatusCode::CONFLICT);

        // Everything else from the store is still an internal failure
        let e: ApiError = FirestoreError::request_failed("boom").into();
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
