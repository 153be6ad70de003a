//! Router registry: ordered prefix table and dispatch.
//!
//! # Responsibilities
//! - Store handler-sets in registration order
//! - Resolve a path to the first registration whose prefix matches
//! - Strip the prefix and hand the request to the handler-set
//! - Detect duplicate prefixes at build time
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan in registration order; first match wins
//! - Explicit `Unmatched` rather than a silent default
//! - Handler-sets are plain `axum::Router`s; they see the stripped path and
//!   can still read the full one through `OriginalUri`

use axum::{
    extract::Request,
    http::{uri::PathAndQuery, StatusCode, Uri},
    response::Response,
    Router,
};
use thiserror::Error;
use tower::ServiceExt;

use crate::config::DuplicatePolicy;
use crate::error::{ApiError, ErrorReport};
use crate::http::context::RequestContext;
use crate::routing::matcher::PathPrefixMatcher;

/// Error raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("prefix '{prefix}' of '{name}' is already mounted by '{existing}'")]
    DuplicatePrefix {
        prefix: String,
        name: String,
        existing: String,
    },

    #[error("prefix '{0}' must start with '/'")]
    InvalidPrefix(String),
}

/// One mounted handler-set.
#[derive(Clone)]
pub struct Registration {
    name: String,
    matcher: PathPrefixMatcher,
    handlers: Router,
    shadowed: bool,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("prefix", &self.matcher.prefix())
            .field("shadowed", &self.shadowed)
            .finish()
    }
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    /// True when an earlier registration owns the same prefix, so this one
    /// never receives traffic.
    pub fn is_shadowed(&self) -> bool {
        self.shadowed
    }

    /// Hand `request` to the handler-set with `remainder` as its path.
    ///
    /// A route or method miss inside the handler-set becomes the same
    /// not-found error as an unmatched prefix.
    pub async fn call(&self, mut request: Request, remainder: &str) -> Result<Response, ApiError> {
        let original_url = original_url(&request);
        *request.uri_mut() = strip_uri(request.uri(), remainder)?;

        if let Some(ctx) = request.extensions_mut().get_mut::<RequestContext>() {
            ctx.base_path = Some(self.prefix().to_string());
        }

        tracing::debug!(handler = %self.name, path = %remainder, "Dispatching to handler-set");

        let response = match self.handlers.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let missed = matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED);
        if missed && response.extensions().get::<ErrorReport>().is_none() {
            tracing::debug!(handler = %self.name, status = %response.status(), "No route in handler-set");
            return Err(ApiError::not_found(original_url));
        }
        Ok(response)
    }
}

/// URL as the client sent it.
fn original_url(request: &Request) -> String {
    request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.original_url.clone())
        .or_else(|| request.uri().path_and_query().map(|pq| pq.to_string()))
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Replace the path of `uri`, keeping its query string.
fn strip_uri(uri: &Uri, remainder: &str) -> Result<Uri, ApiError> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{remainder}?{query}"),
        None => remainder.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse::<PathAndQuery>()
            .map_err(|e| ApiError::internal(format!("rewriting path '{remainder}': {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| ApiError::internal(format!("rewriting uri: {e}")))
}

/// Result of resolving a path.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched {
        registration: &'a Registration,
        remainder: &'a str,
    },
    Unmatched,
}

/// Builds a [`RouterRegistry`] in registration order.
#[derive(Debug)]
pub struct RegistryBuilder {
    policy: DuplicatePolicy,
    entries: Vec<Registration>,
}

impl RegistryBuilder {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
        }
    }

    /// Mount `handlers` under `prefix`.
    pub fn register(
        &mut self,
        prefix: &str,
        name: impl Into<String>,
        handlers: Router,
    ) -> Result<&mut Self, RegistryError> {
        if !prefix.starts_with('/') {
            return Err(RegistryError::InvalidPrefix(prefix.to_string()));
        }

        let name = name.into();
        let matcher = PathPrefixMatcher::new(prefix);

        let existing = self.entries.iter().find(|e| e.matcher.same_mount(&matcher));
        let shadowed = match (existing, self.policy) {
            (Some(existing), DuplicatePolicy::Reject) => {
                return Err(RegistryError::DuplicatePrefix {
                    prefix: prefix.to_string(),
                    name,
                    existing: existing.name.clone(),
                });
            }
            (Some(existing), DuplicatePolicy::Warn) => {
                tracing::warn!(
                    prefix = %prefix,
                    handler = %name,
                    existing = %existing.name,
                    "Duplicate prefix; the earlier handler-set keeps receiving traffic"
                );
                true
            }
            (None, _) => false,
        };

        self.entries.push(Registration {
            name,
            matcher,
            handlers,
            shadowed,
        });
        Ok(self)
    }

    pub fn build(self) -> RouterRegistry {
        RouterRegistry {
            entries: self.entries,
        }
    }
}

/// Ordered, immutable table of mounted handler-sets.
#[derive(Debug, Clone, Default)]
pub struct RouterRegistry {
    entries: Vec<Registration>,
}

impl RouterRegistry {
    pub fn builder(policy: DuplicatePolicy) -> RegistryBuilder {
        RegistryBuilder::new(policy)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the first registration whose prefix covers `path`.
    pub fn resolve<'a>(&'a self, path: &'a str) -> Resolution<'a> {
        self.entries
            .iter()
            .find_map(|registration| {
                registration
                    .matcher
                    .strip(path)
                    .map(|remainder| Resolution::Matched {
                        registration,
                        remainder,
                    })
            })
            .unwrap_or(Resolution::Unmatched)
    }

    /// Resolve and invoke; an unmatched path is a 404 naming the original URL.
    pub async fn dispatch(&self, request: Request) -> Result<Response, ApiError> {
        let path = request.uri().path().to_string();

        match self.resolve(&path) {
            Resolution::Matched {
                registration,
                remainder,
            } => registration.call(request, remainder).await,
            Resolution::Unmatched => Err(ApiError::not_found(original_url(&request))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::OriginalUri;
    use axum::routing::get;

    fn named(label: &'static str) -> Router {
        Router::new().fallback(move |uri: Uri| async move { format!("{label}:{uri}") })
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let mut builder = RouterRegistry::builder(DuplicatePolicy::Warn);
        builder.register("/api/v1/role", "role", named("first")).unwrap();
        builder.register("/api/v1/role", "role-again", named("second")).unwrap();
        let registry = builder.build();

        match registry.resolve("/api/v1/role/3") {
            Resolution::Matched {
                registration,
                remainder,
            } => {
                assert_eq!(registration.name(), "role");
                assert_eq!(remainder, "/3");
            }
            Resolution::Unmatched => panic!("expected a match"),
        }
        assert!(registry.registrations()[1].is_shadowed());
    }

    #[test]
    fn test_reject_duplicates() {
        let mut builder = RouterRegistry::builder(DuplicatePolicy::Reject);
        builder.register("/api/v1/role", "role", named("first")).unwrap();
        let err = builder.register("/API/v1/role", "role-again", named("second")).unwrap_err();

        assert!(matches!(err, RegistryError::DuplicatePrefix { ref existing, .. } if existing == "role"));
    }

    #[test]
    fn test_invalid_prefix() {
        let mut builder = RouterRegistry::builder(DuplicatePolicy::Warn);
        assert!(matches!(
            builder.register("api", "x", named("x")),
            Err(RegistryError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_unmatched() {
        let mut builder = RouterRegistry::builder(DuplicatePolicy::Warn);
        builder.register("/api/v1/user", "user", named("user")).unwrap();
        let registry = builder.build();

        assert!(matches!(registry.resolve("/api/v1/users"), Resolution::Unmatched));
    }

    #[tokio::test]
    async fn test_dispatch_strips_prefix_and_keeps_query() {
        let mut builder = RouterRegistry::builder(DuplicatePolicy::Warn);
        builder.register("/api/v1/item", "item", named("item")).unwrap();
        let registry = builder.build();

        let response = registry.dispatch(request("/api/v1/item/9?page=2")).await.unwrap();
        assert_eq!(body_text(response).await, "item:/9?page=2");

        let response = registry.dispatch(request("/api/v1/item")).await.unwrap();
        assert_eq!(body_text(response).await, "item:/");
    }

    #[tokio::test]
    async fn test_handler_sees_original_uri() {
        let handlers = Router::new().route(
            "/{id}",
            get(|OriginalUri(original): OriginalUri| async move { original.to_string() }),
        );
        let mut builder = RouterRegistry::builder(DuplicatePolicy::Warn);
        builder.register("/api/v1/bill", "bill", handlers).unwrap();
        let registry = builder.build();

        // The outer router normally records OriginalUri; simulate that here.
        let mut req = request("/api/v1/bill/12");
        let uri = req.uri().clone();
        req.extensions_mut().insert(OriginalUri(uri));

        let response = registry.dispatch(req).await.unwrap();
        assert_eq!(body_text(response).await, "/api/v1/bill/12");
    }

    #[tokio::test]
    async fn test_route_miss_inside_handler_set_is_not_found() {
        let handlers = Router::new().route("/{id}", get(|| async { "bill" }));
        let mut builder = RouterRegistry::builder(DuplicatePolicy::Warn);
        builder.register("/api/v1/bill", "bill", handlers).unwrap();
        let registry = builder.build();

        let err = registry.dispatch(request("/api/v1/bill/1/lines")).await.unwrap_err();
        assert_eq!(err.to_string(), "Can't find /api/v1/bill/1/lines on this server.");

        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/v1/bill/1")
            .body(Body::empty())
            .unwrap();
        let err = registry.dispatch(delete).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref url) if url == "/api/v1/bill/1"));
    }

    #[tokio::test]
    async fn test_handler_errors_pass_through() {
        let handlers = Router::new().route(
            "/{id}",
            get(|| async { Err::<&str, _>(ApiError::not_found("/api/v1/bill/7 (archived)")) }),
        );
        let mut builder = RouterRegistry::builder(DuplicatePolicy::Warn);
        builder.register("/api/v1/bill", "bill", handlers).unwrap();
        let registry = builder.build();

        let response = registry.dispatch(request("/api/v1/bill/7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.0.to_string(), "Can't find /api/v1/bill/7 (archived) on this server.");
    }

    #[tokio::test]
    async fn test_dispatch_unmatched_is_not_found() {
        let registry = RouterRegistry::builder(DuplicatePolicy::Warn).build();
        let err = registry.dispatch(request("/nope?x=1")).await.unwrap_err();

        assert_eq!(err.to_string(), "Can't find /nope?x=1 on this server.");
    }
}
