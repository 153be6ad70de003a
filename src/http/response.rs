//! Terminal error rendering.
//!
//! # Responsibilities
//! - Find responses tagged with an [`ErrorReport`] and render the JSON error body
//! - Choose the development or production format from the environment
//! - Turn handler panics into non-operational errors
//!
//! # Design Decisions
//! - Every stage fails with `ApiError`; only this layer writes error bodies
//! - Headers set on the failed response (rate limit, CORS) are kept
//! - Non-operational errors are logged at error level with the full chain

use std::any::Any;

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{format_error, ApiError, ErrorReport};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Middleware: render every tagged error for the configured environment.
pub async fn handle_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let Some(ErrorReport(err)) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    log_error(&err, &method, &path);
    metrics::record_error(err.is_operational());

    let (status, body) = format_error(&err, state.config.environment);
    let (parts, _) = response.into_parts();

    let mut rendered = (status, Json(body)).into_response();
    for (name, value) in &parts.headers {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().append(name.clone(), value.clone());
        }
    }
    rendered
}

fn log_error(err: &ApiError, method: &Method, path: &str) {
    if err.is_operational() {
        tracing::info!(
            method = %method,
            path = %path,
            status = %err.status(),
            error = %err,
            "Request failed"
        );
    } else {
        tracing::error!(
            method = %method,
            path = %path,
            error = ?err,
            "Unexpected error"
        );
    }
}

/// Convert a caught panic into a non-operational error response.
pub fn panic_to_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::internal(format!("handler panicked: {detail}")).into_response()
}
