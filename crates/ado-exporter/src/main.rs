//! Azure DevOps build metrics exporter.
//!
//! # Startup Flow
//!
//! 1. Load configuration from flags and environment (fatal on error)
//! 2. Create the Prometheus registry
//! 3. Build the Azure DevOps HTTP client
//! 4. Bind the HTTP listener and serve `/metrics`, `/health`, `/ready`
//! 5. Spawn the metrics poller
//! 6. Wait for a shutdown signal or a fatal poller error

use std::sync::Arc;

use ado_exporter::config::{Args, Config};
use ado_exporter::handlers::HealthState;
use ado_exporter::observability::ExporterMetrics;
use ado_exporter::routes::{self, AppState};
use ado_exporter::services::AdoClient;
use ado_exporter::tasks::{FixedDelay, MetricsPoller};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ado_exporter=info,exporter=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ADO build metrics exporter");

    let args = Args::parse();
    let config = Config::load(&args).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        listen_address = %config.listen_address,
        poll_interval_secs = config.poll_interval.as_secs_f64(),
        builds = config.builds.len(),
        api_base_url = %config.api_base_url,
        "Configuration loaded successfully"
    );

    let (metrics, metrics_handle) = ExporterMetrics::prometheus();
    metrics.set_build_info(env!("CARGO_PKG_VERSION"));

    let health_state = Arc::new(HealthState::new());

    let client = AdoClient::new(&config.api_base_url, config.pat_token.clone()).map_err(|e| {
        error!(error = %e, "Failed to create Azure DevOps client");
        e
    })?;

    let shutdown_token = CancellationToken::new();

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %bind_address, "Failed to bind metrics server");
            format!("Failed to bind metrics server to {bind_address}: {e}")
        })?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "Metrics server bound successfully");

    let state = Arc::new(AppState::new(
        metrics_handle,
        metrics.clone(),
        Arc::clone(&health_state),
    ));
    let app = routes::build_routes(state);

    let server_token = shutdown_token.child_token();
    let server_handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            server_token.cancelled().await;
            info!("Metrics server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Metrics server failed");
        }
    });

    let poller = MetricsPoller::new(Arc::new(client), metrics, config.builds.clone())
        .with_health(Arc::clone(&health_state));
    let poller_token = shutdown_token.child_token();
    let mut poller_handle = tokio::spawn(
        poller.run(FixedDelay::new(config.poll_interval), poller_token),
    );
    info!("Metrics poller started");

    let poller_result = tokio::select! {
        result = &mut poller_handle => Some(result),
        () = shutdown_signal() => {
            info!("Shutdown signal received, initiating graceful shutdown...");
            None
        }
    };

    health_state.set_not_ready();
    shutdown_token.cancel();

    // Signal path: let the in-flight sweep finish.
    let poller_result = match poller_result {
        Some(result) => result,
        None => poller_handle.await,
    };

    if let Err(e) = server_handle.await {
        error!(error = %e, "Metrics server task panicked");
    }

    match poller_result {
        Ok(Ok(())) => {
            info!("ADO build metrics exporter shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Metrics poller stopped on configuration error");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "Metrics poller task panicked");
            Err(e.into())
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
