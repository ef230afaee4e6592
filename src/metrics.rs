//! Prometheus metrics collection for roomd.
//!
//! Tracks request throughput, error rates, and room/member gauges.
//! Served in text format on the `/metrics` route.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Requests processed, by endpoint.
pub static REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Request failures, by endpoint and error code.
pub static REQUEST_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Rooms currently live in the registry.
pub static ACTIVE_ROOMS: OnceLock<IntGauge> = OnceLock::new();

/// Snapshot flushes completed.
pub static SNAPSHOT_FLUSHES: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls only log registration
/// conflicts.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        REQUESTS,
        IntCounterVec::new(
            Opts::new("roomd_requests_total", "Requests processed by endpoint"),
            &["endpoint"]
        )
    );
    register!(
        REQUEST_ERRORS,
        IntCounterVec::new(
            Opts::new(
                "roomd_request_errors_total",
                "Request failures by endpoint and error code"
            ),
            &["endpoint", "code"]
        )
    );
    register!(
        ACTIVE_ROOMS,
        IntGauge::new("roomd_active_rooms", "Rooms currently live")
    );
    register!(
        SNAPSHOT_FLUSHES,
        IntCounterVec::new(
            Opts::new("roomd_snapshot_flushes_total", "Registry snapshot flushes"),
            &["status"]
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

/// Record one processed request.
pub fn record_request(endpoint: &str) {
    if let Some(c) = REQUESTS.get() {
        c.with_label_values(&[endpoint]).inc();
    }
}

/// Record one failed request with its error code.
pub fn record_request_error(endpoint: &str, code: &str) {
    if let Some(c) = REQUEST_ERRORS.get() {
        c.with_label_values(&[endpoint, code]).inc();
    }
}

/// Update the live-room gauge.
pub fn set_active_rooms(count: i64) {
    if let Some(g) = ACTIVE_ROOMS.get() {
        g.set(count);
    }
}

/// Record a snapshot flush outcome ("ok" or "error").
pub fn record_snapshot_flush(status: &str) {
    if let Some(c) = SNAPSHOT_FLUSHES.get() {
        c.with_label_values(&[status]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_and_gather_roundtrip() {
        init();
        record_request("join");
        record_request_error("poll", "auth_failed");
        set_active_rooms(3);
        let text = gather_metrics();
        assert!(text.contains("roomd_requests_total"));
        assert!(text.contains("roomd_active_rooms"));
    }

    #[test]
    fn recording_without_init_is_a_noop() {
        // Counters may not be set when init() has not run in this
        // process; the helpers must not panic either way.
        record_request("send");
        record_request_error("send", "validation");
    }
}
