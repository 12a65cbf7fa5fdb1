//! Metrics collection and export for the relay.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

/// Metric names.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "relay_requests_total";
    pub const REQUEST_SECONDS: &str = "relay_request_seconds";
    pub const REGISTRATIONS_TOTAL: &str = "relay_registrations_total";
    pub const MESSAGES_PUBLISHED_TOTAL: &str = "relay_messages_published_total";
    pub const FANOUT: &str = "relay_fanout";
    pub const SUBSCRIPTIONS_TOTAL: &str = "relay_subscriptions_total";
    pub const POLLS_TOTAL: &str = "relay_polls_total";
    pub const POLL_MESSAGES: &str = "relay_poll_messages";
    pub const ERRORS_TOTAL: &str = "relay_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    // Describe metrics
    metrics::describe_counter!(names::REQUESTS_TOTAL, "Total number of API requests");
    metrics::describe_histogram!(names::REQUEST_SECONDS, "Request handling time in seconds");
    metrics::describe_counter!(names::REGISTRATIONS_TOTAL, "Total number of registered clients");
    metrics::describe_counter!(
        names::MESSAGES_PUBLISHED_TOTAL,
        "Total number of logged messages by kind"
    );
    metrics::describe_histogram!(names::FANOUT, "Reported fan-out per topic publish");
    metrics::describe_counter!(
        names::SUBSCRIPTIONS_TOTAL,
        "Total number of subscribe requests"
    );
    metrics::describe_counter!(names::POLLS_TOTAL, "Total number of polls");
    metrics::describe_histogram!(names::POLL_MESSAGES, "Messages returned per poll");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of failed requests");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a registration.
pub fn record_registration() {
    counter!(names::REGISTRATIONS_TOTAL).increment(1);
}

/// Record a logged message; `kind` is `direct`, `topic` or `external`.
pub fn record_publish(kind: &'static str, delivered_to: usize) {
    counter!(names::MESSAGES_PUBLISHED_TOTAL, "kind" => kind).increment(1);
    if kind == "topic" {
        histogram!(names::FANOUT).record(delivered_to as f64);
    }
}

/// Record a subscribe request.
pub fn record_subscription() {
    counter!(names::SUBSCRIPTIONS_TOTAL).increment(1);
}

/// Record a poll and its result size.
pub fn record_poll(messages: usize) {
    counter!(names::POLLS_TOTAL).increment(1);
    histogram!(names::POLL_MESSAGES).record(messages as f64);
}

/// Record a failed request.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Counts a request and records its duration on drop.
pub struct RequestMetricsGuard {
    route: &'static str,
    started: Instant,
}

impl RequestMetricsGuard {
    #[must_use]
    pub fn new(route: &'static str) -> Self {
        counter!(names::REQUESTS_TOTAL, "route" => route).increment(1);
        Self {
            route,
            started: Instant::now(),
        }
    }
}

impl Drop for RequestMetricsGuard {
    fn drop(&mut self) {
        histogram!(names::REQUEST_SECONDS, "route" => self.route)
            .record(self.started.elapsed().as_secs_f64());
    }
}
