//! HTTP error type with structured JSON bodies.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::mock_api::ApiError;

/// Error response body: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Handler-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            HttpError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            HttpError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail),
            HttpError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            HttpError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound { .. } => HttpError::NotFound(err.to_string()),
            ApiError::AlreadyExists { .. } => HttpError::Conflict(err.to_string()),
            ApiError::InvalidPatch(_) => HttpError::BadRequest(err.to_string()),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = HttpError::NotFound("patient pat-9".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "patient pat-9");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = HttpError::Internal("lock poisoned".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn collection_errors_map_to_statuses() {
        let missing = ApiError::NotFound {
            entity: "patient",
            id: "x".into(),
        };
        assert!(matches!(HttpError::from(missing), HttpError::NotFound(_)));

        let duplicate = ApiError::AlreadyExists {
            entity: "patient",
            id: "x".into(),
        };
        assert!(matches!(HttpError::from(duplicate), HttpError::Conflict(_)));

        let patch = ApiError::InvalidPatch("bad".into());
        assert!(matches!(HttpError::from(patch), HttpError::BadRequest(_)));
    }
}
