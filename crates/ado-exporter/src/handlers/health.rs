//! Liveness and readiness probes.
//!
//! - `GET /health` - 200 whenever the server answers
//! - `GET /ready` - 200 once the first sweep has completed, 503 before that
//!   and for good once shutdown starts

use axum::{extract::State, http::StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Readiness shared by the poller and the HTTP server.
#[derive(Debug, Default)]
pub struct HealthState {
    ready: AtomicBool,
    /// Latched by `set_not_ready`; once set, `set_ready` is ignored.
    shutting_down: AtomicBool,
}

impl HealthState {
    /// Create a new health state (ready=false).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service ready, unless shutdown has already begun.
    pub fn set_ready(&self) {
        if !self.shutting_down.load(Ordering::SeqCst) {
            self.ready.store(true, Ordering::SeqCst);
        }
    }

    /// Mark the service as shutting down. Readiness stays false from here on.
    pub fn set_not_ready(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Liveness probe handler.
///
/// Answering at all means the process is up.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe handler.
pub async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_health_state_default() {
        let state = HealthState::new();
        assert!(!state.is_ready(), "Should not be ready before the first sweep");
    }

    #[test]
    fn test_health_state_set_ready() {
        let state = HealthState::new();

        state.set_ready();
        assert!(state.is_ready());
    }

    #[test]
    fn test_set_ready_ignored_after_shutdown_begins() {
        let state = HealthState::new();
        state.set_ready();

        state.set_not_ready();
        assert!(!state.is_ready());

        state.set_ready();
        assert!(!state.is_ready(), "Readiness must not come back during shutdown");
    }

    #[tokio::test]
    async fn test_liveness_handler_returns_ok() {
        assert_eq!(liveness_handler().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_handler_follows_state() {
        let state = Arc::new(HealthState::new());
        assert_eq!(
            readiness_handler(State(Arc::clone(&state))).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.set_ready();
        assert_eq!(
            readiness_handler(State(Arc::clone(&state))).await,
            StatusCode::OK
        );

        state.set_not_ready();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
