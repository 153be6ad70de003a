//! Static asset serving.
//!
//! # Responsibilities
//! - Serve files from the configured directories, in order
//! - Fall through to router dispatch when no directory has the file
//!
//! # Design Decisions
//! - Only `GET` and `HEAD` consult the disk
//! - A 404 from one directory moves on to the next; any other outcome
//!   (file, redirect, 304, 416) is final
//! - Traversal and encoding checks are left to `ServeDir`

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::config::StaticAssetsConfig;
use crate::observability::metrics;

/// Outcome of a static lookup.
pub enum AssetLookup {
    /// A directory answered.
    Served(Response),
    /// No directory had the file; the request continues to dispatch.
    Missed(Request),
}

/// Ordered set of static directories.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    directories: Vec<(String, ServeDir)>,
}

impl StaticAssets {
    pub fn new(config: &StaticAssetsConfig) -> Self {
        if !config.enabled {
            return Self::default();
        }

        let directories = config
            .directories
            .iter()
            .map(|dir| (dir.clone(), ServeDir::new(dir)))
            .collect();
        Self { directories }
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    /// Try each directory in order.
    pub async fn serve(&self, request: Request) -> AssetLookup {
        let method = request.method();
        if self.directories.is_empty() || (method != Method::GET && method != Method::HEAD) {
            return AssetLookup::Missed(request);
        }

        for (dir, service) in &self.directories {
            let mut probe = Request::new(Body::empty());
            *probe.method_mut() = request.method().clone();
            *probe.uri_mut() = request.uri().clone();
            *probe.version_mut() = request.version();
            *probe.headers_mut() = request.headers().clone();

            let response = match service.clone().oneshot(probe).await {
                Ok(response) => response,
                Err(never) => match never {},
            };

            if response.status() == StatusCode::NOT_FOUND {
                continue;
            }

            tracing::debug!(
                directory = %dir,
                path = %request.uri().path(),
                status = %response.status(),
                "Served static asset"
            );
            metrics::record_static_hit();

            let mut response = response.map(Body::new);
            response
                .headers_mut()
                .entry(header::CACHE_CONTROL)
                .or_insert(HeaderValue::from_static("public, max-age=0"));
            return AssetLookup::Served(response);
        }

        AssetLookup::Missed(request)
    }
}
