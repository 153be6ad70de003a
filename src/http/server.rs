//! HTTP server setup and pipeline wiring.
//!
//! # Responsibilities
//! - Build shared state from validated configuration
//! - Assemble the ingress pipeline as ordered layers
//! - Serve static assets, then dispatch to the router registry
//! - Bind to a listener and drain in-flight requests on shutdown
//!
//! # Pipeline (outermost first)
//! ```text
//! request id → trace → metrics → security headers → error rendering
//!     → panic capture → preflight → context → rate limit → body limit
//!     → ingestion → sanitization → static assets → registry dispatch
//! ```
//!
//! # Design Decisions
//! - Ordering is fixed in one place (`build_router`)
//! - Headers and error rendering wrap everything, so rejections from any
//!   stage get the same treatment as handler output

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::header::InvalidHeaderValue,
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::http::assets::{AssetLookup, StaticAssets};
use crate::http::context::stamp_context;
use crate::http::request::{x_request_id, MakeRequestUuid};
use crate::http::response::{handle_errors, panic_to_error};
use crate::ingest::ingest_body;
use crate::observability::metrics;
use crate::routing::RouterRegistry;
use crate::sanitize::{sanitize_input, Sanitizer};
use crate::security::headers::{preflight, security_headers, HeaderPolicy};
use crate::security::rate_limit::{rate_limit, run_prune_task, MemoryStore, RateLimitStore, RateLimiter};

/// Error building the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid header value in configuration: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

/// Application state shared by every pipeline stage.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub headers: Arc<HeaderPolicy>,
    pub rate_limiter: Arc<RateLimiter>,
    pub sanitizer: Arc<Sanitizer>,
    pub assets: Arc<StaticAssets>,
    pub registry: Arc<RouterRegistry>,
}

impl AppState {
    /// State with the in-process rate limit store.
    pub fn new(config: GatewayConfig, registry: RouterRegistry) -> Result<Self, ServerError> {
        let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::from_config(&config.rate_limit));
        Self::with_store(config, registry, store)
    }

    /// State with a caller-provided rate limit store (e.g. one shared across instances).
    pub fn with_store(
        config: GatewayConfig,
        registry: RouterRegistry,
        store: Arc<dyn RateLimitStore>,
    ) -> Result<Self, ServerError> {
        Ok(Self {
            headers: Arc::new(HeaderPolicy::from_config(&config.security, &config.cors)?),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit, store)),
            sanitizer: Arc::new(Sanitizer::new(&config.sanitize)),
            assets: Arc::new(StaticAssets::new(&config.static_assets)),
            registry: Arc::new(registry),
            config: Arc::new(config),
        })
    }
}

/// HTTP server for the ingress pipeline.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and handler-sets.
    pub fn new(config: GatewayConfig, registry: RouterRegistry) -> Result<Self, ServerError> {
        Ok(Self::from_state(AppState::new(config, registry)?))
    }

    pub fn from_state(state: AppState) -> Self {
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    /// The assembled pipeline, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.state.config
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = self.state.config.environment.as_str(),
            handler_sets = self.state.registry.len(),
            "HTTP server starting"
        );

        if self.state.rate_limiter.is_enabled() {
            tokio::spawn(run_prune_task(
                self.state.rate_limiter.clone(),
                shutdown.resubscribe(),
            ));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the pipeline. Layers listed last run first.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.body.max_bytes;

    Router::new()
        .fallback(dispatch)
        .layer(from_fn_with_state(state.clone(), sanitize_input))
        .layer(from_fn_with_state(state.clone(), ingest_body))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(from_fn_with_state(state.clone(), stamp_context))
        .layer(from_fn_with_state(state.clone(), preflight))
        .layer(CatchPanicLayer::custom(panic_to_error))
        .layer(from_fn_with_state(state.clone(), handle_errors))
        .layer(from_fn_with_state(state.clone(), security_headers))
        .layer(from_fn(metrics::track_requests))
        .layer(PropagateRequestIdLayer::new(x_request_id()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(x_request_id(), MakeRequestUuid))
        .with_state(state)
}

/// Terminal stage: static assets first, then the router registry.
async fn dispatch(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    match state.assets.serve(request).await {
        AssetLookup::Served(response) => Ok(response),
        AssetLookup::Missed(request) => state.registry.dispatch(request).await,
    }
}
