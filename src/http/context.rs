//! Per-request context.
//!
//! The context is created once, right after preflight handling, and travels in
//! the request extensions. Later stages fill it in (body, cookies, files) and
//! rewrite it (sanitization). Handler-sets read it through the [`Ctx`]
//! extractor; they never see the raw body of a parsed payload.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::http::request::{client_ip, X_REQUEST_ID};
use crate::http::server::AppState;
use crate::ingest::form;

/// How the body was ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    /// Nothing parsed; the raw stream (if any) is left for the handler-set.
    #[default]
    Empty,
    Json,
    Form,
    Multipart,
}

/// A file part buffered from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Everything the pipeline knows about the request in flight.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Path as received, before any prefix stripping.
    pub path: String,
    /// Path plus query string, as received.
    pub original_url: String,
    pub headers: HeaderMap,
    /// Resolved client address; honours `trust_proxy`.
    pub client_ip: Option<IpAddr>,
    pub request_id: Option<String>,
    /// Parsed query string. Repeated keys are arrays until sanitization.
    pub query: Map<String, Value>,
    /// Parsed body; an empty object when nothing was parsed.
    pub body: Value,
    pub body_kind: BodyKind,
    pub cookies: BTreeMap<String, Value>,
    pub files: Vec<UploadedFile>,
    /// Arrays removed from the query by pollution filtering.
    pub query_polluted: Map<String, Value>,
    /// Arrays removed from a form body by pollution filtering.
    pub body_polluted: Map<String, Value>,
    /// Prefix of the handler-set that received the request.
    pub base_path: Option<String>,
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Build the context from request parts at ingress.
    pub fn from_parts(parts: &Parts, trust_proxy: bool, now: DateTime<Utc>) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let original_url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            original_url,
            headers: parts.headers.clone(),
            client_ip: client_ip(&parts.headers, peer, trust_proxy),
            request_id: parts
                .headers
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            query: form::parse_pairs(parts.uri.query().unwrap_or_default().as_bytes()),
            body: Value::Object(Map::new()),
            body_kind: BodyKind::Empty,
            cookies: BTreeMap::new(),
            files: Vec::new(),
            query_polluted: Map::new(),
            body_polluted: Map::new(),
            base_path: None,
            request_time: now,
        }
    }

    /// Key the rate limiter counts against.
    pub fn client_key(&self) -> String {
        self.client_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Request time as an ISO-8601 string with millisecond precision.
    pub fn request_time_iso(&self) -> String {
        self.request_time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Files uploaded under one form field, in arrival order.
    pub fn files_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
        self.files.iter().filter(move |f| f.field == field)
    }
}

/// Stamp a fresh [`RequestContext`] onto the request.
pub async fn stamp_context(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts, state.config.trust_proxy, Utc::now());

    tracing::debug!(
        method = %ctx.method,
        path = %ctx.path,
        client = %ctx.client_key(),
        "Incoming request"
    );

    request = Request::from_parts(parts, body);
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Extractor giving handler-sets the sanitized request context.
#[derive(Debug, Clone)]
pub struct Ctx(pub RequestContext);

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .map(Ctx)
            .ok_or_else(|| ApiError::internal("request context missing; handler mounted outside the pipeline"))
    }
}
