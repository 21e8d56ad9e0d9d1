//! Service layer for the exporter.
//!
//! # Components
//!
//! - `ado_client` - HTTP client for the Azure DevOps build metrics API

pub mod ado_client;

pub use ado_client::{AdoClient, BuildMetricsClient};
// Mock client for poller tests (exposed for integration tests)
pub use ado_client::mock::{MockBuildMetricsClient, MockReply};
