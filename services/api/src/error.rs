//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as a JSON error response.

use crate::config::ConfigError;
use academy_core::ports::PortError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more request fields are missing or malformed.
    #[error("{message}")]
    Validation { message: String, fields: Vec<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {0}")]
    RateLimited(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// A dependency needed for the primary effect is not configured.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// A validation failure naming the offending request fields.
    pub fn invalid_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        ApiError::Validation {
            message: format!("Missing or invalid fields: {}", fields.join(", ")),
            fields,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut fields = None;
        let (status, error_type, message) = match self {
            ApiError::Validation {
                message,
                fields: names,
            } => {
                fields = Some(names);
                (StatusCode::BAD_REQUEST, "validation", message)
            }
            ApiError::NotFound(msg) | ApiError::Port(PortError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "notFound", msg)
            }
            ApiError::Conflict(msg) | ApiError::Port(PortError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "conflict", msg)
            }
            ApiError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, "rateLimited", msg),
            ApiError::Unauthorized | ApiError::Port(PortError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication required".to_string(),
            ),
            ApiError::Unavailable(msg) => {
                tracing::warn!("Unavailable dependency: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg)
            }
            other => {
                tracing::error!("Internal error: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "type": error_type,
            "message": message,
            "statusCode": status.as_u16(),
        });
        if let Some(fields) = fields {
            error["fields"] = json!(fields);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let (status, body) = render(ApiError::invalid_fields(["title", "date"])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["fields"], json!(["title", "date"]));
    }

    #[tokio::test]
    async fn port_errors_map_to_http_statuses() {
        let (status, _) = render(PortError::NotFound("meeting".into()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = render(PortError::Conflict("slot".into()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let (status, body) =
            render(PortError::Unexpected("password=hunter2".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }
}
