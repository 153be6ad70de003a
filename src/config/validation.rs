//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, limits > 0, addresses parse)
//! - Check header values are representable on the wire
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("rate_limit.scope must start with '/', got '{0}'")]
    InvalidScope(String),

    #[error("cors.allow_methods: '{0}' is not an HTTP method")]
    InvalidMethod(String),

    #[error("{field}: '{value}' is not a valid header value")]
    InvalidHeaderValue { field: &'static str, value: String },

    #[error("static_assets.directories must not contain empty paths")]
    EmptyStaticDirectory,
}

/// Validate a loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.enabled {
        if rate_limit.window_secs == 0 {
            errors.push(ValidationError::Zero { field: "rate_limit.window_secs" });
        }
        if rate_limit.max_requests == 0 {
            errors.push(ValidationError::Zero { field: "rate_limit.max_requests" });
        }
        if !rate_limit.scope.starts_with('/') {
            errors.push(ValidationError::InvalidScope(rate_limit.scope.clone()));
        }
    }

    if config.body.max_bytes == 0 {
        errors.push(ValidationError::Zero { field: "body.max_bytes" });
    }

    for method in &config.cors.allow_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod(method.clone()));
        }
    }

    let header_fields: [(&'static str, String); 3] = [
        ("cors.allow_origin", config.cors.allow_origin.clone()),
        ("cors.allow_headers", config.cors.allow_headers.join(", ")),
        (
            "security.content_security_policy",
            config.security.content_security_policy.clone(),
        ),
    ];
    for (field, value) in header_fields {
        if HeaderValue::from_str(&value).is_err() {
            errors.push(ValidationError::InvalidHeaderValue { field, value });
        }
    }

    if config.static_assets.directories.iter().any(|d| d.trim().is_empty()) {
        errors.push(ValidationError::EmptyStaticDirectory);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
