//! Pipeline error type.
//!
//! Every stage and every handler-set fails with [`ApiError`]. Converting an
//! `ApiError` into a response tags the response with an [`ErrorReport`]
//! extension; the terminal error handler in [`crate::http::response`] finds
//! that tag and renders the single, environment-aware error body.
//!
//! Operational errors (policy rejections, not-found, handler validation) carry a
//! stable status and a message that is safe to show. Non-operational errors
//! (`Internal`, captured panics) never reach a production client verbatim.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::config::Environment;

/// Message shown in production for faults that are not operational.
pub const GENERIC_MESSAGE: &str = "Something went wrong!";

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No registered prefix and no static file matched (404).
    #[error("Can't find {0} on this server.")]
    NotFound(String),

    /// Client exceeded its quota for the current window (429).
    #[error("{0}")]
    RateLimited(String),

    /// Body larger than the configured ceiling (413).
    #[error("request entity too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Body could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Expected failure raised by a handler-set, e.g. validation.
    #[error("{message}")]
    Operational { status: StatusCode, message: String },

    /// Unexpected fault. Message and chain are logged but hidden in production.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Operational failure with an explicit status.
    pub fn fail(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Operational {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(original_url: impl Into<String>) -> Self {
        Self::NotFound(original_url.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Operational { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe to show a client.
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

/// Marker placed in response extensions so the error handler can format it.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub Arc<ApiError>);

/// JSON error body.
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct ErrorBody {
    /// `fail` for 4xx, `error` otherwise.
    pub status: String,
    pub message: String,
    /// Debug rendering, development only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Source chain / backtrace, development only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

fn status_class(status: StatusCode) -> &'static str {
    if status.is_client_error() {
        "fail"
    } else {
        "error"
    }
}

/// Render an error for the given environment.
///
/// Returns the status to send alongside the body; non-operational errors are
/// always reported as 500.
pub fn format_error(err: &ApiError, environment: Environment) -> (StatusCode, ErrorBody) {
    let status = err.status();

    if !environment.is_production() {
        let stack = match err {
            ApiError::Internal(inner) => format!("{:?}", inner),
            other => format!("{:?}", other),
        };
        return (
            status,
            ErrorBody {
                status: status_class(status).to_string(),
                message: err.to_string(),
                error: Some(format!("{:?}", err)),
                stack: Some(stack),
            },
        );
    }

    if err.is_operational() {
        (
            status,
            ErrorBody {
                status: status_class(status).to_string(),
                message: err.to_string(),
                error: None,
                stack: None,
            },
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody {
                status: "error".to_string(),
                message: GENERIC_MESSAGE.to_string(),
                error: None,
                stack: None,
            },
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Production-safe body; the error handler re-renders it per environment.
        let (status, body) = format_error(&self, Environment::Production);
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorReport(Arc::new(self)));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::not_found("/x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::RateLimited("slow".into()).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::fail(StatusCode::CONFLICT, "taken").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::internal("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_message_contains_path() {
        let err = ApiError::not_found("/api/v1/nothing?x=1");
        assert_eq!(err.to_string(), "Can't find /api/v1/nothing?x=1 on this server.");
    }

    #[test]
    fn test_production_hides_internal_detail() {
        let err = ApiError::internal("db password is hunter2");
        let (status, body) = format_error(&err, Environment::Production);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, GENERIC_MESSAGE);
        assert_eq!(body.status, "error");
        assert!(body.stack.is_none());
        assert!(body.error.is_none());
    }

    #[test]
    fn test_production_keeps_operational_message() {
        let err = ApiError::fail(StatusCode::UNPROCESSABLE_ENTITY, "price must be positive");
        let (status, body) = format_error(&err, Environment::Production);

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.status, "fail");
        assert_eq!(body.message, "price must be positive");
        assert!(body.stack.is_none());
    }

    #[test]
    fn test_development_exposes_stack() {
        let err = ApiError::from(anyhow::anyhow!("disk full").context("writing invoice"));
        let (status, body) = format_error(&err, Environment::Development);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "writing invoice");
        let stack = body.stack.unwrap();
        assert!(stack.contains("disk full"));
    }

    #[test]
    fn test_into_response_tags_report() {
        let response = ApiError::not_found("/missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert!(report.0.is_operational());
    }
}
