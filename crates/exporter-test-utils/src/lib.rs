//! # Exporter Test Utilities
//!
//! Shared test utilities for the ADO build metrics exporter.
//!
//! This crate provides:
//! - Server test harness (`TestExporterServer` for E2E tests)
//! - Metrics capture (`MetricsCapture` over a debugging recorder)
//! - Scripted sweep schedules (`ScriptedSchedule`)
//! - Azure DevOps API fixtures for `wiremock`
//! - A Prometheus text sample lookup (`find_sample`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use exporter_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestExporterServer::spawn().await?;
//!     let body = server.scrape().await?;
//!     assert!(body.contains("ado_exporter_build_info"));
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod metrics_capture;
pub mod prometheus_text;
pub mod schedule;
pub mod server_harness;

// Re-export commonly used items
pub use fixtures::*;
pub use metrics_capture::*;
pub use prometheus_text::*;
pub use schedule::*;
pub use server_harness::*;
