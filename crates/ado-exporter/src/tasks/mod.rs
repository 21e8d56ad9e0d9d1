//! Background tasks for the exporter.
//!
//! # Tasks
//!
//! - `metrics_poller` - Sweeps the configured builds and updates the registry

pub mod metrics_poller;

pub use metrics_poller::{FixedDelay, MetricsPoller, SweepSchedule, SweepSummary};
