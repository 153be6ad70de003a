//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all pipeline stages
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the router table is fixed at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BodyConfig, CorsConfig, DuplicatePolicy, Environment, GatewayConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, RateLimitConfig, RoutingConfig, SanitizeConfig,
    SecurityConfig, StaticAssetsConfig,
};
