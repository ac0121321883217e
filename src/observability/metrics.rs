//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, target
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_rpc_calls_total` (counter): RPC invocations by protocol, outcome
//! - `gateway_rpc_call_duration_seconds` (histogram): RPC latency by protocol
//! - `gateway_proxy_retries_total` (counter): proxy retries by method
//!
//! Recording is a no-op until a recorder is installed, so handlers call these
//! unconditionally.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, target: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("target", target.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rpc_call(protocol: &str, outcome: &'static str, start: Instant) {
    counter!(
        "gateway_rpc_calls_total",
        "protocol" => protocol.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gateway_rpc_call_duration_seconds", "protocol" => protocol.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_proxy_retry(method: &str) {
    counter!("gateway_proxy_retries_total", "method" => method.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let start = Instant::now();
        record_request("GET", 200, "status", start);
        record_rpc_call("EVFS", "ok", start);
        record_proxy_retry("POST");
    }
}
