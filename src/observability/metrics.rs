//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): dispatches by component, operation, outcome
//! - `dispatch_duration_seconds` (histogram): dispatch latency by component
//! - `component_init_total` (counter): component `init` runs
//! - `config_reloads_total` (counter): named-config reloads by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_dispatch(component: &str, operation: &str, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "component" => component.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("dispatch_duration_seconds", "component" => component.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_component_init(component: &str) {
    metrics::counter!("component_init_total", "component" => component.to_string()).increment(1);
}

pub fn record_config_reload(outcome: &'static str) {
    metrics::counter!("config_reloads_total", "outcome" => outcome).increment(1);
}
