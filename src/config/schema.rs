//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the ingress gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Production hides error internals; development exposes them.
    pub environment: Environment,

    /// Resolve the client address from `X-Forwarded-For` (load balancer in front).
    ///
    /// The left-most entry is taken as the client and it is whatever the
    /// client sent, so it keys the rate limiter only as reliably as the proxy
    /// in front rewrites the header. Leave this off when clients can reach the
    /// gateway directly, or they can rotate the value and never hit the quota.
    pub trust_proxy: bool,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Hardening response headers.
    pub security: SecurityConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Body ingestion limits.
    pub body: BodyConfig,

    /// Input sanitization.
    pub sanitize: SanitizeConfig,

    /// Static asset directories.
    pub static_assets: StaticAssetsConfig,

    /// Router registry behaviour.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            trust_proxy: true,
            listener: ListenerConfig::default(),
            security: SecurityConfig::default(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            body: BodyConfig::default(),
            sanitize: SanitizeConfig::default(),
            static_assets: StaticAssetsConfig::default(),
            routing: RoutingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Emit the hardening header set on every response.
    pub enable_headers: bool,

    /// `Content-Security-Policy` value.
    pub content_security_policy: String,

    /// `Strict-Transport-Security` max-age in seconds.
    pub hsts_max_age_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            content_security_policy: [
                "default-src 'self'",
                "base-uri 'self'",
                "block-all-mixed-content",
                "font-src 'self' https: data:",
                "frame-ancestors 'self'",
                "img-src 'self' data:",
                "object-src 'none'",
                "script-src 'self'",
                "script-src-attr 'none'",
                "style-src 'self' https: 'unsafe-inline'",
                "upgrade-insecure-requests",
            ]
            .join(";"),
            hsts_max_age_secs: 15_552_000, // 180 days
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origin; `*` allows any.
    pub allow_origin: String,

    /// Methods advertised on preflight.
    pub allow_methods: Vec<String>,

    /// Request headers advertised on preflight.
    pub allow_headers: Vec<String>,

    /// Preflight cache duration.
    pub max_age_secs: u64,

    /// Credentialed requests. When true a wildcard origin is echoed back
    /// instead of `*`, since browsers refuse `*` with credentials.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: ["POST", "GET", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: ["X-Requested-With", "X-HTTP-Method-Override", "Content-Type", "Accept"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            max_age_secs: 86_400, // 24 hours
            allow_credentials: false,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Path prefix the limiter is scoped to.
    pub scope: String,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Maximum accepted requests per client within one window.
    pub max_requests: u32,

    /// Message returned to rejected clients.
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: "/api".to_string(),
            window_secs: 60 * 60,
            max_requests: 10_000,
            message: "Too many requests from this IP, please try again in an hour!".to_string(),
        }
    }
}

/// Body ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Maximum accepted payload in bytes (json, form and multipart).
    pub max_bytes: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            // Bulk document uploads.
            max_bytes: 1536 * 1024 * 1024,
        }
    }
}

/// Sanitization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Keys whose duplicate values are kept as an ordered sequence.
    pub allow_list: Vec<String>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            allow_list: [
                "duration",
                "ratingQuantity",
                "ratingAverage",
                "maxGroupSize",
                "difficulty",
                "price",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}

/// Static asset configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticAssetsConfig {
    /// Serve files from disk before router dispatch.
    pub enabled: bool,

    /// Directories consulted in order.
    pub directories: Vec<String>,
}

impl Default for StaticAssetsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directories: vec!["public".to_string(), "staging".to_string()],
        }
    }
}

/// What to do when two handler-sets register the same prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Log a warning; the first registration stays authoritative.
    #[default]
    Warn,
    /// Refuse to start.
    Reject,
}

/// Router registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    pub duplicate_prefixes: DuplicatePolicy,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format; when unset, JSON in production and pretty otherwise.
    pub log_format: Option<LogFormat>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: None,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
