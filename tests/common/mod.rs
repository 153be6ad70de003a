//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode, Uri},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use erp_ingress::config::{DuplicatePolicy, GatewayConfig};
use erp_ingress::error::ApiError;
use erp_ingress::http::{build_router, AppState, Ctx, HttpServer};
use erp_ingress::lifecycle::Shutdown;
use erp_ingress::routing::RouterRegistry;

/// Development config with static assets off, so tests never touch the disk
/// unless they ask to.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.static_assets.enabled = false;
    config
}

/// Counts handler-set invocations.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handler-set that reports what it received.
pub fn probe(label: &'static str, hits: Hits) -> Router {
    Router::new().fallback(move |uri: Uri, Ctx(ctx): Ctx, raw: String| {
        let hits = hits.clone();
        async move {
            hits.hit();
            Json(json!({
                "label": label,
                "path": uri.path(),
                "client": ctx.client_key(),
                "base_path": ctx.base_path,
                "query": ctx.query,
                "query_polluted": ctx.query_polluted,
                "body": ctx.body,
                "body_polluted": ctx.body_polluted,
                "cookies": ctx.cookies,
                "files": ctx.files.len(),
                "raw": raw,
            }))
        }
    })
}

async fn explode() -> &'static str {
    panic!("ledger imbalance")
}

async fn database_down() -> Result<&'static str, ApiError> {
    Err(ApiError::internal("connection refused: db-primary:27017"))
}

async fn validation_failure() -> Result<&'static str, ApiError> {
    Err(ApiError::fail(StatusCode::UNPROCESSABLE_ENTITY, "quantity must be positive"))
}

/// Handler-set with routes that fail in each way a resource service can.
pub fn faulty() -> Router {
    Router::new()
        .route("/panic", get(explode))
        .route("/internal", get(database_down))
        .route("/invalid", get(validation_failure))
}

/// Registry with a probe on `/api/v1/item`, `/api/v1/role` (twice) and a
/// faulty set on `/api/v1/broken`.
pub fn test_registry(hits: &Hits) -> RouterRegistry {
    let mut builder = RouterRegistry::builder(DuplicatePolicy::Warn);
    builder
        .register("/api/v1/item", "item", probe("item", hits.clone()))
        .unwrap()
        .register("/api/v1/role", "role", probe("role", hits.clone()))
        .unwrap()
        .register("/api/v1/role", "roles", probe("roles", hits.clone()))
        .unwrap()
        .register("/api/v1/broken", "broken", faulty())
        .unwrap();
    builder.build()
}

/// In-process pipeline.
pub fn pipeline(config: GatewayConfig, registry: RouterRegistry) -> Router {
    build_router(AppState::new(config, registry).unwrap())
}

/// Send one request through the pipeline.
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

/// Split a response into status, headers and JSON body (`Null` when empty or not JSON).
pub async fn parts(response: Response) -> (StatusCode, HeaderMap, Value) {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

pub fn get_from(uri: &str, client: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

pub fn post_from(uri: &str, client: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", client)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap()
}

/// Start a real server on an ephemeral port.
pub async fn start_server(config: GatewayConfig, registry: RouterRegistry) -> (SocketAddr, Shutdown) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, registry).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    (addr, shutdown)
}
