//! HTTP routes for the exporter.
//!
//! Defines the Axum router and application state.

use crate::handlers::{self, HealthState};
use crate::observability::{ExporterMetrics, ProcessCollector};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Per-request timeout for every route.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Renders the registry the poller writes into.
    pub metrics_handle: PrometheusHandle,

    pub metrics: ExporterMetrics,

    /// Refreshed on every scrape.
    pub process: Arc<ProcessCollector>,

    pub health: Arc<HealthState>,
}

impl AppState {
    pub fn new(
        metrics_handle: PrometheusHandle,
        metrics: ExporterMetrics,
        health: Arc<HealthState>,
    ) -> Self {
        Self {
            metrics_handle,
            metrics,
            process: Arc::new(ProcessCollector::new()),
            health,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/metrics` - Prometheus scrape endpoint
/// - `/health` - Liveness probe
/// - `/ready` - Readiness probe
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::liveness_handler))
        .route("/ready", get(handlers::readiness_handler))
        .with_state(Arc::clone(&state.health));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    metrics_routes
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
