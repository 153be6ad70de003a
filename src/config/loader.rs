//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variables consulted after the file is read.
pub const ENV_ENVIRONMENT: &str = "GATEWAY_ENV";
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";
pub const ENV_TRUST_PROXY: &str = "GATEWAY_TRUST_PROXY";
pub const ENV_LOG_LEVEL: &str = "GATEWAY_LOG_LEVEL";

/// Load configuration: optional TOML file, then process environment, then validation.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply overrides from an environment lookup.
///
/// Takes the lookup as a function so tests don't touch the process environment.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_ENVIRONMENT) {
        config.environment = value.parse().map_err(|reason| ConfigError::Env {
            name: ENV_ENVIRONMENT,
            reason,
        })?;
    }

    if let Some(value) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = value;
    }

    if let Some(value) = lookup(ENV_TRUST_PROXY) {
        config.trust_proxy = parse_bool(&value).ok_or_else(|| ConfigError::Env {
            name: ENV_TRUST_PROXY,
            reason: format!("expected a boolean, got '{}'", value),
        })?;
    }

    if let Some(value) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = value;
    }

    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
