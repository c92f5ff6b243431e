//! Metrics collection and exposition.
//!
//! # Metrics
//! - `errors_rendered_total` (counter): error responses by status, code
//! - `handler_reloads_total` (counter): successful handler swaps
//! - `handler_generation` (gauge): swaps since startup
//! - `connections_accepted_total` (counter)
//! - `connections_active` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so tests and
//!   library users pay nothing
//! - Labels stay low-cardinality: status and machine code only

use std::net::SocketAddr;

use axum::http::StatusCode;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::api::responder::ErrorBody;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_error_rendered(status: StatusCode, body: &ErrorBody) {
    ::metrics::counter!(
        "errors_rendered_total",
        "status" => status.as_u16().to_string(),
        "code" => body.code().to_string()
    )
    .increment(1);
}

pub fn record_handler_reload(generation: u64) {
    ::metrics::counter!("handler_reloads_total").increment(1);
    ::metrics::gauge!("handler_generation").set(generation as f64);
}

pub fn record_connection_opened() {
    ::metrics::counter!("connections_accepted_total").increment(1);
    ::metrics::gauge!("connections_active").increment(1.0);
}

pub fn record_connection_closed() {
    ::metrics::gauge!("connections_active").decrement(1.0);
}
