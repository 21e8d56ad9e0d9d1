//! Build metrics poller background task.
//!
//! Sweeps every configured build target once, waits, and sweeps again. Each
//! target is fetched on its own, in configured order, never in parallel.
//!
//! # Failure model
//!
//! - A failed fetch (transport, status, decode) is logged and counted with
//!   `success="0"`; the sweep continues with the next target.
//! - A malformed target is fatal. Targets are re-parsed at the start of every
//!   sweep and the first malformed one ends the task with a `ConfigError`
//!   before any request of that sweep is sent.
//!
//! # Scheduling
//!
//! The wait between sweeps comes from a `SweepSchedule`. `FixedDelay` sleeps
//! for the poll interval after each sweep completes, so fetch time is not
//! subtracted from the interval. Tests substitute their own schedule.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When the token
//! is cancelled, the task completes its current sweep and exits cleanly.

use crate::config::ConfigError;
use crate::handlers::HealthState;
use crate::models::{parse_targets, FetchOutcome, MonitoredBuild};
use crate::observability::ExporterMetrics;
use crate::services::BuildMetricsClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Waits between two sweeps.
#[async_trait::async_trait]
pub trait SweepSchedule: Send {
    /// Return when the next sweep should start.
    async fn wait(&mut self);
}

/// Sleeps a fixed delay after every sweep.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait::async_trait]
impl SweepSchedule for FixedDelay {
    async fn wait(&mut self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub samples: usize,
}

/// Polls the build metrics API and folds the results into the registry.
pub struct MetricsPoller {
    client: Arc<dyn BuildMetricsClient>,
    metrics: ExporterMetrics,
    builds: Vec<String>,
    health: Option<Arc<HealthState>>,
    first_sweep_done: AtomicBool,
}

impl MetricsPoller {
    /// Create a poller over the raw `org/project/definition` entries.
    pub fn new(
        client: Arc<dyn BuildMetricsClient>,
        metrics: ExporterMetrics,
        builds: Vec<String>,
    ) -> Self {
        Self {
            client,
            metrics,
            builds,
            health: None,
            first_sweep_done: AtomicBool::new(false),
        }
    }

    /// Mark `health` ready once the first sweep completes.
    ///
    /// Later sweeps leave readiness alone, so a shutdown that clears it
    /// mid-sweep is not undone.
    pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
        self.health = Some(health);
        self
    }

    /// Run sweeps until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MalformedTarget` as soon as a sweep finds a
    /// malformed target. The caller is expected to terminate the process.
    #[instrument(skip_all, name = "exporter.task.poller")]
    pub async fn run<S: SweepSchedule>(
        self,
        mut schedule: S,
        cancel_token: CancellationToken,
    ) -> Result<(), ConfigError> {
        info!(
            target: "exporter.task.poller",
            builds = self.builds.len(),
            "Starting metrics poller task"
        );

        loop {
            self.run_sweep().await?;

            info!(target: "exporter.task.poller", "Sleeping until next sweep");

            tokio::select! {
                () = schedule.wait() => {}
                () = cancel_token.cancelled() => {
                    info!(
                        target: "exporter.task.poller",
                        "Metrics poller task received shutdown signal, exiting"
                    );
                    break;
                }
            }
        }

        info!(target: "exporter.task.poller", "Metrics poller task stopped");
        Ok(())
    }

    /// Poll every configured target once.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MalformedTarget` before any request is sent if
    /// any configured entry is not a valid `org/project/definition` triple.
    pub async fn run_sweep(&self) -> Result<SweepSummary, ConfigError> {
        let targets = parse_targets(&self.builds).map_err(|e| {
            error!(target: "exporter.task.poller", error = %e, "Illegal build target");
            e
        })?;

        let mut summary = SweepSummary::default();
        for target in &targets {
            summary.attempted += 1;
            if let Ok(response) = self.poll_target(target).await {
                summary.succeeded += 1;
                summary.samples += response.value.len();
            }
        }

        info!(
            target: "exporter.task.poller",
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            samples = summary.samples,
            "Sweep complete"
        );

        if !self.first_sweep_done.swap(true, Ordering::SeqCst) {
            if let Some(health) = &self.health {
                health.set_ready();
            }
        }

        Ok(summary)
    }

    /// Fetch one target and record the outcome.
    ///
    /// Always increments `build_fetch_requests_total` exactly once; on success
    /// also sets `build_metric_value` for every returned sample.
    pub async fn poll_target(&self, target: &MonitoredBuild) -> FetchOutcome {
        info!(target: "exporter.task.poller", build = %target, "Fetching metrics for build");

        let outcome = self.client.fetch_build_metrics(target).await;

        self.metrics.record_fetch(target, outcome.is_ok());

        match &outcome {
            Ok(response) => {
                for sample in &response.value {
                    self.metrics.set_build_metric(target, sample);
                }
                info!(
                    target: "exporter.task.poller",
                    build = %target,
                    count = response.count,
                    "Fetched metrics"
                );
            }
            Err(e) => {
                warn!(
                    target: "exporter.task.poller",
                    build = %target,
                    reason = e.reason(),
                    error = %e,
                    "Error making request"
                );
            }
        }

        outcome
    }
}
