//! Azure DevOps build metrics exporter library.
//!
//! Polls the Azure DevOps build metrics API for a configured set of build
//! definitions and exposes the results as Prometheus series:
//!
//! - `build_fetch_requests_total` - one increment per fetch attempt
//! - `build_metric_value` - last reported value per build metric sample
//!
//! # Architecture
//!
//! ```text
//! tasks/metrics_poller.rs -> services/ado_client.rs -> Azure DevOps
//!          |
//!          v
//! observability/metrics.rs <- handlers/metrics.rs <- routes/mod.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Settings from flags and environment
//! - `errors` - Fetch error type
//! - `handlers` - HTTP request handlers
//! - `models` - Build targets and API payloads
//! - `observability` - Metrics registry and process stats
//! - `routes` - Axum router setup
//! - `services` - Azure DevOps client
//! - `tasks` - Background poller

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod tasks;
