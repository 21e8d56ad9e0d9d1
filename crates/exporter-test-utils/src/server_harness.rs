//! Test server harness for E2E testing
//!
//! Provides `TestExporterServer` for spawning the real exporter router in tests.

use ado_exporter::handlers::HealthState;
use ado_exporter::observability::ExporterMetrics;
use ado_exporter::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness serving `/metrics`, `/health` and `/ready` on a random port.
///
/// Each instance owns its own Prometheus registry, so tests never see series
/// recorded by another test.
///
/// # Example
/// ```rust,ignore
/// let server = TestExporterServer::spawn().await?;
/// server.metrics().set_build_info("1.2.3");
/// let body = server.scrape().await?;
/// assert!(body.contains("version=\"1.2.3\""));
/// ```
pub struct TestExporterServer {
    addr: SocketAddr,
    metrics: ExporterMetrics,
    health: Arc<HealthState>,
    _handle: JoinHandle<()>,
}

impl TestExporterServer {
    /// Spawn a new test server bound to 127.0.0.1:0.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let (metrics, handle) = ExporterMetrics::prometheus();
        let health = Arc::new(HealthState::new());

        let state = Arc::new(AppState::new(handle, metrics.clone(), Arc::clone(&health)));
        let app = routes::build_routes(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            metrics,
            health,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Registry rendered by this server's `/metrics`.
    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    /// GET `/metrics` and return the body.
    pub async fn scrape(&self) -> Result<String, anyhow::Error> {
        let response = reqwest::get(format!("{}/metrics", self.url())).await?;
        anyhow::ensure!(
            response.status().is_success(),
            "scrape returned {}",
            response.status()
        );
        Ok(response.text().await?)
    }
}

impl Drop for TestExporterServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
