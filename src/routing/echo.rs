//! Echo handler-set.
//!
//! Mounted on every catalog prefix by the binary until the resource services
//! are wired in. It answers any method and path under its prefix with what
//! the pipeline produced: the sanitized query, body and cookies, a summary of
//! uploaded files and the request metadata.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, Uri},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::http::context::Ctx;

#[derive(Clone)]
struct EchoState {
    resource: Arc<str>,
}

/// One uploaded file, without its bytes.
#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

/// Echo response body.
#[derive(Debug, Serialize)]
pub struct EchoReply {
    pub resource: String,
    pub method: String,
    /// Path below the mount prefix.
    pub path: String,
    pub original_url: String,
    pub base_path: Option<String>,
    pub client_ip: Option<String>,
    pub request_id: Option<String>,
    pub request_time: String,
    pub query: Map<String, Value>,
    pub body: Value,
    pub cookies: BTreeMap<String, Value>,
    pub files: Vec<FileSummary>,
}

/// Build the echo handler-set for `resource`.
pub fn router(resource: &str) -> Router {
    Router::new().fallback(echo).with_state(EchoState {
        resource: Arc::from(resource),
    })
}

async fn echo(
    State(state): State<EchoState>,
    method: Method,
    uri: Uri,
    OriginalUri(original): OriginalUri,
    Ctx(ctx): Ctx,
) -> Json<EchoReply> {
    let files = ctx
        .files
        .iter()
        .map(|f| FileSummary {
            field: f.field.clone(),
            file_name: f.file_name.clone(),
            content_type: f.content_type.clone(),
            size: f.size(),
        })
        .collect();

    Json(EchoReply {
        resource: state.resource.to_string(),
        method: method.to_string(),
        path: uri.path().to_string(),
        original_url: original.to_string(),
        base_path: ctx.base_path.clone(),
        client_ip: ctx.client_ip.map(|ip| ip.to_string()),
        request_id: ctx.request_id.clone(),
        request_time: ctx.request_time_iso(),
        query: ctx.query,
        body: ctx.body,
        cookies: ctx.cookies,
        files,
    })
}
