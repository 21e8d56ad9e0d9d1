//! HTTP handlers for the exporter.

pub mod health;
pub mod metrics;

pub use health::{liveness_handler, readiness_handler, HealthState};
pub use metrics::metrics_handler;
