//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Mount the resource catalog
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::routing::{catalog, echo};

/// Start the gateway and serve until a shutdown signal arrives.
pub async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    if !config.environment.is_production() {
        tracing::info!("Running in development mode");
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .with_context(|| format!("metrics address '{}'", config.observability.metrics_address))?;
        metrics::init_metrics(addr).context("installing metrics exporter")?;
    }

    let registry = catalog::standard_registry(config.routing.duplicate_prefixes, echo::router)
        .context("mounting resource catalog")?;
    tracing::info!(handler_sets = registry.len(), "Resource catalog mounted");

    let server = HttpServer::new(config, registry).context("building ingress pipeline")?;

    let bind_address = server.config().listener.bind_address.clone();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, server_shutdown).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
