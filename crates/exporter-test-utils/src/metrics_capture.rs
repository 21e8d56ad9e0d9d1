//! Metric assertions over a debugging recorder.

use ado_exporter::observability::ExporterMetrics;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use metrics_util::MetricKind;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An `ExporterMetrics` backed by a `DebuggingRecorder`.
pub struct MetricsCapture {
    metrics: ExporterMetrics,
    snapshotter: Snapshotter,
}

impl Default for MetricsCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCapture {
    pub fn new() -> Self {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        Self {
            metrics: ExporterMetrics::new(Arc::new(recorder)),
            snapshotter,
        }
    }

    /// Registry to hand to the code under test.
    pub fn metrics(&self) -> ExporterMetrics {
        self.metrics.clone()
    }

    /// Current value of every series.
    pub fn snapshot(&self) -> CapturedMetrics {
        let series = self
            .snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _unit, _description, value)| {
                let labels = key
                    .key()
                    .labels()
                    .map(|l| (l.key().to_string(), l.value().to_string()))
                    .collect();
                CapturedSeries {
                    kind: key.kind(),
                    name: key.key().name().to_string(),
                    labels,
                    value,
                }
            })
            .collect();
        CapturedMetrics { series }
    }
}

/// One recorded series.
#[derive(Debug)]
pub struct CapturedSeries {
    pub kind: MetricKind,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: DebugValue,
}

impl CapturedSeries {
    fn matches(&self, name: &str, labels: &[(&str, &str)]) -> bool {
        self.name == name
            && self.labels.len() == labels.len()
            && labels
                .iter()
                .all(|(k, v)| self.labels.get(*k).map(String::as_str) == Some(*v))
    }
}

/// Point-in-time copy of a `MetricsCapture`.
#[derive(Debug)]
pub struct CapturedMetrics {
    series: Vec<CapturedSeries>,
}

impl CapturedMetrics {
    /// Counter value for the series with exactly these labels.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.series
            .iter()
            .find(|s| s.matches(name, labels))
            .and_then(|s| match s.value {
                DebugValue::Counter(v) => Some(v),
                _ => None,
            })
    }

    /// Gauge value for the series with exactly these labels.
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.series
            .iter()
            .find(|s| s.matches(name, labels))
            .and_then(|s| match &s.value {
                DebugValue::Gauge(v) => Some(v.into_inner()),
                _ => None,
            })
    }

    /// Every series recorded under `name`.
    pub fn series(&self, name: &str) -> Vec<&CapturedSeries> {
        self.series.iter().filter(|s| s.name == name).collect()
    }

    /// Sum of all counter series under `name`.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.series(name)
            .iter()
            .map(|s| match s.value {
                DebugValue::Counter(v) => v,
                _ => 0,
            })
            .sum()
    }
}
