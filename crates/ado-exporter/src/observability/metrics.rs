//! Metrics registry for the exporter.
//!
//! `ExporterMetrics` is built once at startup and handed to both the poller
//! and the `/metrics` handler. It wraps a `metrics::Recorder` and runs every
//! `counter!`/`gauge!` call against that recorder through
//! `metrics::with_local_recorder`, so nothing touches the global recorder.
//! Production uses the Prometheus recorder; tests plug in
//! `metrics_util::debugging::DebuggingRecorder`.
//!
//! # Series
//!
//! - `build_fetch_requests_total{org, project, definition, success}` - counter,
//!   one increment per poll attempt, `success` is `"1"` or `"0"`
//! - `build_metric_value{target, name, scope, date}` - gauge, last write wins
//! - `ado_exporter_build_info{version}` - constant 1
//! - `process_*` - process resource usage, refreshed on scrape
//!
//! # Cardinality
//!
//! Fetch counter labels are bounded by the configured target list. Gauge
//! labels grow with the distinct `(name, scope, date)` triples the API
//! reports; series are never removed for the life of the process.

use crate::models::{BuildMetricSample, MonitoredBuild};
use metrics::{counter, describe_counter, describe_gauge, gauge, Recorder, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

pub const FETCH_REQUESTS_TOTAL: &str = "build_fetch_requests_total";
pub const BUILD_METRIC_VALUE: &str = "build_metric_value";
pub const BUILD_INFO: &str = "ado_exporter_build_info";
pub const PROCESS_RESIDENT_MEMORY_BYTES: &str = "process_resident_memory_bytes";
pub const PROCESS_VIRTUAL_MEMORY_BYTES: &str = "process_virtual_memory_bytes";
pub const PROCESS_START_TIME_SECONDS: &str = "process_start_time_seconds";
pub const PROCESS_CPU_SECONDS_TOTAL: &str = "process_cpu_seconds_total";

/// Process resource usage sampled for the `process_*` series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessStats {
    pub resident_memory_bytes: u64,
    pub virtual_memory_bytes: u64,
    pub start_time_seconds: u64,
    /// User and system CPU time consumed since the collector started.
    pub cpu_seconds_total: f64,
}

/// Handle to the metrics registry shared by the poller and the HTTP handler.
#[derive(Clone)]
pub struct ExporterMetrics {
    recorder: Arc<dyn Recorder + Send + Sync>,
}

impl std::fmt::Debug for ExporterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterMetrics").finish_non_exhaustive()
    }
}

impl ExporterMetrics {
    /// Wrap a recorder and register the series descriptions with it.
    pub fn new(recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        let metrics = Self { recorder };
        metrics.describe();
        metrics
    }

    /// Build a Prometheus-backed registry.
    ///
    /// The recorder is not installed globally; the returned handle renders
    /// exactly what was recorded through this registry.
    pub fn prometheus() -> (Self, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (Self::new(Arc::new(recorder)), handle)
    }

    fn with_recorder<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self.recorder.as_ref(), f)
    }

    fn describe(&self) {
        self.with_recorder(|| {
            describe_counter!(
                FETCH_REQUESTS_TOTAL,
                "Build metric requests made to Azure DevOps"
            );
            describe_gauge!(BUILD_METRIC_VALUE, "Build definition metric values");
            describe_gauge!(BUILD_INFO, "Exporter build information");
            describe_gauge!(
                PROCESS_RESIDENT_MEMORY_BYTES,
                Unit::Bytes,
                "Resident memory size in bytes"
            );
            describe_gauge!(
                PROCESS_VIRTUAL_MEMORY_BYTES,
                Unit::Bytes,
                "Virtual memory size in bytes"
            );
            describe_gauge!(
                PROCESS_START_TIME_SECONDS,
                Unit::Seconds,
                "Start time of the process since unix epoch in seconds"
            );
            // Float seconds; the facade's counters are integer only.
            describe_gauge!(
                PROCESS_CPU_SECONDS_TOTAL,
                Unit::Seconds,
                "Total user and system CPU time spent in seconds"
            );
        });
    }

    /// Record one poll attempt for a target.
    ///
    /// Metric: `build_fetch_requests_total`
    /// Labels: `org`, `project`, `definition`, `success`
    pub fn record_fetch(&self, target: &MonitoredBuild, success: bool) {
        let success = if success { "1" } else { "0" };
        self.with_recorder(|| {
            counter!(FETCH_REQUESTS_TOTAL,
                "org" => target.organization.clone(),
                "project" => target.project.clone(),
                "definition" => target.definition.clone(),
                "success" => success
            )
            .increment(1);
        });
    }

    /// Publish one sample reported for a target.
    ///
    /// Metric: `build_metric_value`
    /// Labels: `target`, `name`, `scope`, `date`
    pub fn set_build_metric(&self, target: &MonitoredBuild, sample: &BuildMetricSample) {
        #[allow(clippy::cast_precision_loss)]
        let value = sample.int_value as f64;
        self.with_recorder(|| {
            gauge!(BUILD_METRIC_VALUE,
                "target" => target.target(),
                "name" => sample.name.clone(),
                "scope" => sample.scope.clone(),
                "date" => sample.date.clone()
            )
            .set(value);
        });
    }

    /// Publish the constant build-info series.
    pub fn set_build_info(&self, version: &str) {
        self.with_recorder(|| {
            gauge!(BUILD_INFO, "version" => version.to_string()).set(1.0);
        });
    }

    /// Publish process resource usage.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_process_stats(&self, stats: &ProcessStats) {
        self.with_recorder(|| {
            gauge!(PROCESS_RESIDENT_MEMORY_BYTES).set(stats.resident_memory_bytes as f64);
            gauge!(PROCESS_VIRTUAL_MEMORY_BYTES).set(stats.virtual_memory_bytes as f64);
            gauge!(PROCESS_START_TIME_SECONDS).set(stats.start_time_seconds as f64);
            gauge!(PROCESS_CPU_SECONDS_TOTAL).set(stats.cpu_seconds_total);
        });
    }
}
