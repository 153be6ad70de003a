//! Per-client rate limiting.
//!
//! # Responsibilities
//! - Count requests per client within a fixed window
//! - Reject clients over quota with 429 before the body is read
//! - Advertise the quota through `X-RateLimit-*` headers
//!
//! # Design Decisions
//! - Counting sits behind [`RateLimitStore`] so a shared store can replace
//!   the in-process one when several instances run behind a balancer
//! - Rejected requests do not consume quota
//! - Store failures surface as non-operational errors (fail closed)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::http::context::RequestContext;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::matcher::PathPrefixMatcher;

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Longest window the in-process store will track (about a century).
const MAX_WINDOW_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// When the client's current window ends.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    fn apply_headers(&self, headers: &mut HeaderMap, now: DateTime<Utc>) {
        headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET.clone(), HeaderValue::from(self.reset_at.timestamp()));
        if !self.allowed {
            let retry_after = (self.reset_at - now).num_seconds().max(0);
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
    }
}

/// Storage for request counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `client_id` at `now` and decide whether it may pass.
    async fn increment(&self, client_id: &str, now: DateTime<Utc>) -> anyhow::Result<RateLimitDecision>;

    /// Drop counters whose window ended before `now`. Returns how many were removed.
    async fn prune(&self, _now: DateTime<Utc>) -> usize {
        0
    }
}

struct Window {
    count: u32,
    started: DateTime<Utc>,
}

/// Fixed-window counters held in process memory.
pub struct MemoryStore {
    windows: DashMap<String, Window>,
    window: chrono::Duration,
    max_requests: u32,
}

impl MemoryStore {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        let secs = window.as_secs().clamp(1, MAX_WINDOW_SECS);
        Self {
            windows: DashMap::new(),
            window: chrono::Duration::seconds(secs as i64),
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_requests)
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn hit(&self, client_id: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut entry = self
            .windows
            .entry(client_id.to_string())
            .or_insert_with(|| Window { count: 0, started: now });

        if now - entry.started >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        let reset_at = entry.started + self.window;
        if entry.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_at,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests - entry.count,
            reset_at,
        }
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| now - w.started < self.window);
        before.saturating_sub(self.windows.len())
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn increment(&self, client_id: &str, now: DateTime<Utc>) -> anyhow::Result<RateLimitDecision> {
        Ok(self.hit(client_id, now))
    }

    async fn prune(&self, now: DateTime<Utc>) -> usize {
        self.sweep(now)
    }
}

/// Limiter bound to its path scope and rejection message.
pub struct RateLimiter {
    enabled: bool,
    scope: PathPrefixMatcher,
    message: String,
    window: Duration,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            enabled: config.enabled,
            scope: PathPrefixMatcher::new(&config.scope),
            message: config.message.clone(),
            window: Duration::from_secs(config.window_secs.max(1)),
            store,
        }
    }

    /// Whether requests to `path` are counted.
    pub fn applies_to(&self, path: &str) -> bool {
        self.enabled && self.scope.matches(path)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }
}

/// Middleware: count the request and reject it when the client is over quota.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let limiter = &state.rate_limiter;
    if !limiter.applies_to(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let (key, now) = match request.extensions().get::<RequestContext>() {
        Some(ctx) => (ctx.client_key(), ctx.request_time),
        None => ("unknown".to_string(), Utc::now()),
    };

    let decision = limiter.store.increment(&key, now).await?;

    if !decision.allowed {
        tracing::warn!(client = %key, limit = decision.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = ApiError::RateLimited(limiter.message.clone()).into_response();
        decision.apply_headers(response.headers_mut(), now);
        return Ok(response);
    }

    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut(), now);
    Ok(response)
}

/// Periodically drop expired counters until shutdown.
pub async fn run_prune_task(limiter: Arc<RateLimiter>, mut shutdown: broadcast::Receiver<()>) {
    let period = limiter.window.min(Duration::from_secs(600));
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let removed = limiter.store.prune(Utc::now()).await;
                if removed > 0 {
                    tracing::debug!(removed, "Pruned expired rate limit windows");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Rate limit prune task stopping");
                break;
            }
        }
    }
}
