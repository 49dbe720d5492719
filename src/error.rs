// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{engine::EngineError, store::StoreError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username, event not valid in the current phase)
    Conflict(String),

    // 503 Service Unavailable (session store unreachable; the client may retry)
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, retryable) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    false,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, false),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg, false),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, false),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, false),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, true),
        };
        let body = Json(json!({
            "error": error_message,
            "retryable": retryable,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Events that do not fit the run's current phase are a client conflict.
impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

/// An unreachable store is retryable. A record that cannot be encoded or
/// decoded stays broken, so it is a plain 500.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Encoding(e) => {
                AppError::InternalServerError(format!("Session record encoding: {}", e))
            }
            err => {
                tracing::error!("Session store error: {}", err);
                AppError::ServiceUnavailable(
                    "Session store is unavailable, please try again".to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unreachable_store_is_retryable() {
        let err = StoreError::Io(std::io::Error::other("disk gone"));
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn corrupt_record_is_not_retryable() {
        let broken = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let (status, body) = body_of(StoreError::Encoding(broken).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["retryable"], false);
        assert_eq!(body["error"], "Internal Server Error");
    }
}
