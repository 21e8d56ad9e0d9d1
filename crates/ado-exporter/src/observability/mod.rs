//! Observability for the exporter.
//!
//! Provides the metrics registry and the process resource collector.

pub mod metrics;
pub mod process;

pub use self::metrics::{ExporterMetrics, ProcessStats};
pub use process::ProcessCollector;
