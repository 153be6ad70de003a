//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): requests rejected over quota
//! - `gateway_errors_total` (counter): error responses by operational flag
//! - `gateway_static_hits_total` (counter): requests answered from disk
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - No path label: paths carry record ids and would explode cardinality

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_error(operational: bool) {
    counter!("gateway_errors_total", "operational" => operational.to_string()).increment(1);
}

pub fn record_static_hit() {
    counter!("gateway_static_hits_total").increment(1);
}

/// Middleware: count and time every request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_string();

    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}
