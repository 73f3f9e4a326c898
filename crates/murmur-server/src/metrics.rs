//! Metrics collection and export for Murmur.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use murmur_core::Outcome;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "murmur_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "murmur_connections_active";
    pub const MESSAGES_TOTAL: &str = "murmur_messages_total";
    pub const MESSAGES_BYTES: &str = "murmur_messages_bytes";
    pub const DELIVERIES_TOTAL: &str = "murmur_deliveries_total";
    pub const COMMANDS_TOTAL: &str = "murmur_commands_total";
    pub const ROOMS_ACTIVE: &str = "murmur_rooms_active";
    pub const ERRORS_TOTAL: &str = "murmur_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of connections since server start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of active connections"
    );
    metrics::describe_counter!(names::MESSAGES_TOTAL, "Total number of inbound messages");
    metrics::describe_counter!(names::MESSAGES_BYTES, "Total bytes of inbound messages");
    metrics::describe_counter!(
        names::DELIVERIES_TOTAL,
        "Total number of relayed frames delivered to room members"
    );
    metrics::describe_counter!(names::COMMANDS_TOTAL, "Total number of control commands");
    metrics::describe_gauge!(names::ROOMS_ACTIVE, "Current number of non-empty rooms");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a new connection.
pub fn record_connection() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a disconnection.
pub fn record_disconnection() {
    gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record an inbound message.
pub fn record_message(bytes: usize, kind: &'static str) {
    counter!(names::MESSAGES_TOTAL, "kind" => kind).increment(1);
    counter!(names::MESSAGES_BYTES, "kind" => kind).increment(bytes as u64);
}

/// Record what the relay did with an inbound message.
pub fn record_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Relayed { recipients, .. } => {
            counter!(names::DELIVERIES_TOTAL).increment(*recipients as u64);
        }
        Outcome::NotInRoom => record_error("not_in_room"),
        Outcome::Command(command) => {
            counter!(names::COMMANDS_TOTAL, "command" => command.verb()).increment(1);
        }
        Outcome::UnknownCommand => record_error("unknown_command"),
    }
}

/// Update active room count.
pub fn set_active_rooms(count: usize) {
    gauge!(names::ROOMS_ACTIVE).set(count as f64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Metrics guard that records disconnection on drop.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Create a new metrics guard, recording a connection.
    #[must_use]
    pub fn new() -> Self {
        record_connection();
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        record_disconnection();
    }
}
