//! Body and cookie ingestion.
//!
//! # Data Flow
//! ```text
//! Request (after rate limiting)
//!     → Content-Type classification
//!     → security::limits (declared length, bounded read)
//!     → form.rs / multipart.rs / strict JSON
//!     → cookies.rs
//!     → RequestContext { body, body_kind, files, cookies }
//! ```
//!
//! # Design Decisions
//! - A parsed body is consumed; the handler-set reads it from the context
//! - Unknown content types pass the raw stream through untouched
//! - Malformed JSON and JSON scalars are operational 400s

pub mod cookies;
pub mod form;
pub mod multipart;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::http::context::{BodyKind, RequestContext, UploadedFile};
use crate::http::server::AppState;
use crate::security::limits;

/// Classify a request by its `Content-Type` essence.
pub fn classify(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return BodyKind::Empty;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/json" => BodyKind::Json,
        "application/x-www-form-urlencoded" => BodyKind::Form,
        "multipart/form-data" => BodyKind::Multipart,
        _ => BodyKind::Empty,
    }
}

/// Parse a JSON payload; only objects and arrays are accepted at the top level.
pub fn parse_json(payload: &[u8]) -> Result<Value, ApiError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?;

    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err(ApiError::BadRequest(
            "JSON body must be an object or an array".to_string(),
        ))
    }
}

async fn read_payload(
    kind: BodyKind,
    parts: &Parts,
    payload: Bytes,
    limit: usize,
) -> Result<(Value, Vec<UploadedFile>), ApiError> {
    match kind {
        BodyKind::Json => Ok((parse_json(&payload)?, Vec::new())),
        BodyKind::Form => Ok((Value::Object(form::parse_pairs(&payload)), Vec::new())),
        BodyKind::Multipart => {
            let (fields, files) = multipart::parse_multipart(parts, payload, limit).await?;
            Ok((Value::Object(fields), files))
        }
        BodyKind::Empty => Ok((Value::Object(Map::new()), Vec::new())),
    }
}

fn context_mut(parts: &mut Parts) -> Result<&mut RequestContext, ApiError> {
    parts
        .extensions
        .get_mut::<RequestContext>()
        .ok_or_else(|| ApiError::internal("request context missing at ingestion"))
}

/// Middleware: parse the body and cookies into the request context.
pub async fn ingest_body(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let limit = state.config.body.max_bytes;
    let (mut parts, body) = request.into_parts();
    let kind = classify(&parts.headers);

    let body = if kind == BodyKind::Empty {
        body
    } else {
        limits::check_declared_length(&parts.headers, limit)?;
        let payload = limits::collect_limited(body, limit).await?;
        let size = payload.len();
        let (parsed, files) = read_payload(kind, &parts, payload, limit).await?;

        tracing::debug!(kind = ?kind, size, files = files.len(), "Body ingested");

        let ctx = context_mut(&mut parts)?;
        ctx.body = parsed;
        ctx.body_kind = kind;
        ctx.files = files;
        Body::empty()
    };

    let cookies = cookies::parse_cookies(&parts.headers);
    context_mut(&mut parts)?.cookies = cookies;

    Ok(next.run(Request::from_parts(parts, body)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&content_type("application/json; charset=utf-8")), BodyKind::Json);
        assert_eq!(classify(&content_type("Application/JSON")), BodyKind::Json);
        assert_eq!(
            classify(&content_type("application/x-www-form-urlencoded")),
            BodyKind::Form
        );
        assert_eq!(
            classify(&content_type("multipart/form-data; boundary=x")),
            BodyKind::Multipart
        );
        assert_eq!(classify(&content_type("text/csv")), BodyKind::Empty);
        assert_eq!(classify(&HeaderMap::new()), BodyKind::Empty);
    }

    #[test]
    fn test_parse_json_accepts_objects_and_arrays() {
        assert_eq!(parse_json(br#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(parse_json(b"[1,2]").unwrap(), json!([1, 2]));
        assert_eq!(parse_json(b"  ").unwrap(), json!({}));
    }

    #[test]
    fn test_parse_json_strict() {
        assert!(matches!(parse_json(b"\"text\""), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_json(b"42"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_json(b"{broken"), Err(ApiError::BadRequest(_))));
    }
}
