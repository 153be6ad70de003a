//! ERP API ingress gateway library.
//!
//! Every request passes one ordered pipeline before it reaches a resource
//! handler-set: security headers, preflight, rate limiting, body ingestion,
//! sanitization, static assets, then prefix dispatch. See
//! [`http::server::build_router`] for the exact order.

pub mod config;
pub mod error;
pub mod http;
pub mod ingest;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod sanitize;
pub mod security;

pub use config::schema::GatewayConfig;
pub use error::ApiError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
