/// Prometheus-compatible metrics
///
/// Counts HTTP traffic, moderation decisions, and volunteer sign-ups.
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    /// Moderation decisions by action (approved/rejected)
    pub static ref MODERATION_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_decisions_total",
        "Total number of moderation decisions",
        &["action"]
    )
    .unwrap();

    /// Events submitted
    pub static ref EVENTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "events_created_total",
        "Total number of events submitted"
    )
    .unwrap();

    /// Volunteer sign-ups
    pub static ref VOLUNTEER_SIGNUPS_TOTAL: IntCounter = register_int_counter!(
        "volunteer_signups_total",
        "Total number of volunteer sign-ups"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/events", 200, 0.05);
        let metrics = render_metrics();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_moderation_decision_labels() {
        MODERATION_DECISIONS_TOTAL
            .with_label_values(&["approved"])
            .inc();
        MODERATION_DECISIONS_TOTAL
            .with_label_values(&["rejected"])
            .inc();
        let metrics = render_metrics();
        assert!(metrics.contains("moderation_decisions_total"));
    }

    #[test]
    fn test_metrics_rendering() {
        VOLUNTEER_SIGNUPS_TOTAL.inc();
        EVENTS_CREATED_TOTAL.inc();

        let metrics = render_metrics();
        assert!(metrics.contains("# HELP"));
        assert!(metrics.contains("volunteer_signups_total"));
        assert!(metrics.contains("events_created_total"));
    }
}
