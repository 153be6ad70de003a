//! Request body size limits.
//!
//! # Responsibilities
//! - Reject a declared `Content-Length` above the ceiling before reading
//! - Cap bytes actually read for chunked or lying bodies
//!
//! # Design Decisions
//! - Limits checked before parsing (early rejection)
//! - Both paths fail with 413 Payload Too Large
//! - The ceiling is shared by json, form and multipart ingestion

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::error::ApiError;

/// Fail fast when the client announces a body larger than `limit`.
pub fn check_declared_length(headers: &HeaderMap, limit: usize) -> Result<(), ApiError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match declared {
        Some(length) if length > limit as u64 => {
            tracing::debug!(length, limit, "Declared body exceeds limit");
            Err(ApiError::PayloadTooLarge { limit })
        }
        _ => Ok(()),
    }
}

/// Read the whole body, failing once more than `limit` bytes arrive.
pub async fn collect_limited(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::PayloadTooLarge { limit })
        }
        Err(err) => Err(ApiError::BadRequest(format!("failed to read request body: {err}"))),
    }
}
