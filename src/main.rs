//! ERP API ingress gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ ┌──────────────────────── INGRESS PIPELINE ────────────────────────┐
//!              │ request id ─▶ trace ─▶ metrics ─▶ security headers ─▶ errors    │
//!              │   ─▶ panic capture ─▶ preflight ─▶ context ─▶ rate limit        │
//!              │   ─▶ body limit ─▶ ingestion ─▶ sanitization                    │
//!              │   ─▶ static assets (public, staging)                            │
//!              │   ─▶ router registry ─▶ /api/v1/<resource> handler-set          │
//!              └──────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use erp_ingress::config::{self, validation::validate_config, ConfigError};
use erp_ingress::lifecycle::startup;
use erp_ingress::observability::logging;

/// ERP API ingress gateway.
#[derive(Debug, Parser)]
#[command(name = "erp-ingress", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability, config.environment)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.environment.as_str(),
        bind_address = %config.listener.bind_address,
        trust_proxy = config.trust_proxy,
        "erp-ingress starting"
    );

    startup::run(config).await?;
    Ok(())
}
