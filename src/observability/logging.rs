//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick the output format for the environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

use crate::config::{Environment, LogFormat, ObservabilityConfig};

/// Resolve the output format: explicit config, else by environment.
pub fn resolve_format(config: &ObservabilityConfig, environment: Environment) -> LogFormat {
    config.log_format.unwrap_or(if environment.is_production() {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    })
}

fn filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},tower_http=info", config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig, environment: Environment) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(filter(config));

    match resolve_format(config, environment) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_follows_environment() {
        let config = ObservabilityConfig::default();
        assert_eq!(resolve_format(&config, Environment::Production), LogFormat::Json);
        assert_eq!(resolve_format(&config, Environment::Development), LogFormat::Pretty);
    }

    #[test]
    fn test_explicit_format_wins() {
        let config = ObservabilityConfig {
            log_format: Some(LogFormat::Pretty),
            ..ObservabilityConfig::default()
        };
        assert_eq!(resolve_format(&config, Environment::Production), LogFormat::Pretty);
    }
}
