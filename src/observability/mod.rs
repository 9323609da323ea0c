//! Observability for the DAO
//!
//! - Structured JSON logging with a process-wide minimum severity
//! - Typed events, each with a fixed severity
//! - Atomic counters
//!
//! Observability is read-only: a failed log write never fails a request.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{DaoMetrics, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event at its own severity with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
