//! Prometheus metrics endpoint handler.
//!
//! This endpoint is unauthenticated so Prometheus can scrape it. The PAT
//! never appears in any series.

use crate::routes::AppState;
use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;

/// Prometheus text exposition format, version 0.0.4.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for GET /metrics
///
/// Refreshes the `process_*` gauges, then renders the whole registry.
/// Build series reflect the latest completed fetch for each target.
#[tracing::instrument(skip_all, name = "exporter.metrics.scrape")]
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.process.collect(&state.metrics);

    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics_handle.render(),
    )
}
