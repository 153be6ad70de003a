//! Security and CORS response headers.
//!
//! # Responsibilities
//! - Compute the hardening header set for a request
//! - Compute the CORS headers, including the preflight set
//! - Answer `OPTIONS` preflights before any other stage runs
//!
//! # Design Decisions
//! - Header computation is a pure function of (policy, request headers)
//! - Headers are computed once at entry and merged once at exit, so error
//!   responses, static files and preflights all carry them
//! - A header already set further down the pipeline is never overwritten
//! - One credential policy: wildcard origin without credentials, or an
//!   echoed origin with credentials

use axum::{
    extract::{Request, State},
    http::{
        header::{self, InvalidHeaderValue},
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{CorsConfig, SecurityConfig};
use crate::http::server::AppState;

static X_DNS_PREFETCH_CONTROL: HeaderName = HeaderName::from_static("x-dns-prefetch-control");
static EXPECT_CT: HeaderName = HeaderName::from_static("expect-ct");
static X_DOWNLOAD_OPTIONS: HeaderName = HeaderName::from_static("x-download-options");
static X_PERMITTED_CROSS_DOMAIN_POLICIES: HeaderName =
    HeaderName::from_static("x-permitted-cross-domain-policies");

/// Precomputed header values for the whole process.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    hardening: HeaderMap,
    allow_origin: HeaderValue,
    wildcard_origin: bool,
    allow_credentials: bool,
    preflight: HeaderMap,
}

impl HeaderPolicy {
    pub fn from_config(security: &SecurityConfig, cors: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        let mut hardening = HeaderMap::new();
        if security.enable_headers {
            hardening.insert(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_str(&security.content_security_policy)?,
            );
            hardening.insert(X_DNS_PREFETCH_CONTROL.clone(), HeaderValue::from_static("off"));
            hardening.insert(EXPECT_CT.clone(), HeaderValue::from_static("max-age=0"));
            hardening.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
            hardening.insert(
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_str(&format!(
                    "max-age={}; includeSubDomains",
                    security.hsts_max_age_secs
                ))?,
            );
            hardening.insert(X_DOWNLOAD_OPTIONS.clone(), HeaderValue::from_static("noopen"));
            hardening.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
            hardening.insert(X_PERMITTED_CROSS_DOMAIN_POLICIES.clone(), HeaderValue::from_static("none"));
            hardening.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
            hardening.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("0"));
        }

        let mut preflight = HeaderMap::new();
        preflight.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_str(&cors.allow_methods.join(", "))?,
        );
        preflight.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_str(&cors.allow_headers.join(", "))?,
        );
        preflight.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(cors.max_age_secs));
        preflight.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static(if cors.allow_credentials { "true" } else { "false" }),
        );

        Ok(Self {
            hardening,
            allow_origin: HeaderValue::from_str(&cors.allow_origin)?,
            wildcard_origin: cors.allow_origin == "*",
            allow_credentials: cors.allow_credentials,
            preflight,
        })
    }

    /// Headers every response to this request must carry.
    pub fn response_headers(&self, request_headers: &HeaderMap) -> HeaderMap {
        let mut headers = self.hardening.clone();
        self.cors_headers(request_headers, &mut headers);
        headers
    }

    /// Full header set for a preflight answer.
    pub fn preflight_headers(&self, request_headers: &HeaderMap) -> HeaderMap {
        let mut headers = self.response_headers(request_headers);
        for (name, value) in &self.preflight {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    fn cors_headers(&self, request_headers: &HeaderMap, headers: &mut HeaderMap) {
        let origin = request_headers.get(header::ORIGIN);

        match (self.wildcard_origin, self.allow_credentials, origin) {
            // Browsers reject `*` on credentialed requests.
            (true, true, Some(origin)) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
            }
            (true, _, _) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
            }
            (false, _, _) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
            }
        }

        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }
}

/// Merge `headers` into `target`, keeping anything already present.
pub fn merge_missing(target: &mut HeaderMap, headers: &HeaderMap) {
    for (name, value) in headers {
        if !target.contains_key(name) {
            target.insert(name.clone(), value.clone());
        }
    }
}

/// Outermost pipeline stage: attach security and CORS headers to every response.
pub async fn security_headers(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let headers = state.headers.response_headers(request.headers());
    let mut response = next.run(request).await;
    merge_missing(response.headers_mut(), &headers);
    response
}

/// Answer `OPTIONS` immediately; nothing after this stage runs for a preflight.
pub async fn preflight(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    tracing::info!(
        target: "erp_ingress::preflight",
        path = %request.uri().path(),
        origin = ?request.headers().get(header::ORIGIN),
        "!OPTIONS"
    );

    let mut response = StatusCode::OK.into_response();
    *response.headers_mut() = state.headers.preflight_headers(request.headers());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allow_credentials: bool) -> HeaderPolicy {
        let cors = CorsConfig {
            allow_credentials,
            ..CorsConfig::default()
        };
        HeaderPolicy::from_config(&SecurityConfig::default(), &cors).unwrap()
    }

    fn with_origin(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers
    }

    #[test]
    fn test_hardening_headers_present() {
        let headers = policy(false).response_headers(&HeaderMap::new());

        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
        assert_eq!(
            headers[header::STRICT_TRANSPORT_SECURITY],
            "max-age=15552000; includeSubDomains"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));
    }

    #[test]
    fn test_headers_can_be_disabled() {
        let security = SecurityConfig {
            enable_headers: false,
            ..SecurityConfig::default()
        };
        let policy = HeaderPolicy::from_config(&security, &CorsConfig::default()).unwrap();
        let headers = policy.response_headers(&HeaderMap::new());

        assert!(!headers.contains_key(header::X_FRAME_OPTIONS));
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_preflight_headers() {
        let headers = policy(false).preflight_headers(&with_origin("https://erp.example"));

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "POST, GET, PUT, DELETE, OPTIONS"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "false");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "X-Requested-With, X-HTTP-Method-Override, Content-Type, Accept"
        );
    }

    #[test]
    fn test_credentials_echo_origin() {
        let headers = policy(true).response_headers(&with_origin("https://erp.example"));

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://erp.example");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::VARY], "Origin");
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut target = HeaderMap::new();
        target.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        merge_missing(&mut target, &policy(false).response_headers(&HeaderMap::new()));

        assert_eq!(target[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(target[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }
}
