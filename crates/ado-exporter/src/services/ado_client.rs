//! Azure DevOps build metrics HTTP client.
//!
//! Fetches `/{org}/{project}/_apis/build/definitions/{definition}/metrics`
//! for one target at a time.
//!
//! # Behavior
//!
//! - One `reqwest::Client` per process, reused across sweeps
//! - Basic auth with username `user` and the PAT token as password
//! - Fixed 5 second timeout, no retries
//! - Status codes outside 200..=203 are failures
//! - The PAT token is never logged

use crate::config::ConfigError;
use crate::errors::FetchError;
use crate::models::{BuildMetricsResponse, MonitoredBuild};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Timeout for one build metrics request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// API version pinned on every request.
pub const API_VERSION: &str = "5.1-preview.1";

/// Username paired with the PAT token. Azure DevOps ignores its value.
const BASIC_AUTH_USER: &str = "user";

/// Accepted status codes.
const ACCEPTED_STATUS: std::ops::RangeInclusive<u16> = 200..=203;

/// Source of build metrics for one target (enables mocking).
#[async_trait::async_trait]
pub trait BuildMetricsClient: Send + Sync {
    /// Fetch the metrics of one build definition.
    async fn fetch_build_metrics(
        &self,
        target: &MonitoredBuild,
    ) -> Result<BuildMetricsResponse, FetchError>;
}

/// HTTP client for the Azure DevOps build definition metrics API.
#[derive(Clone)]
pub struct AdoClient {
    /// HTTP client with the fetch timeout applied.
    client: Client,

    /// API root, e.g. `https://dev.azure.com`.
    base_url: Url,

    /// Personal access token.
    pat_token: SecretString,
}

impl AdoClient {
    /// Create a client with the fixed 5 second timeout.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidApiBaseUrl` if `base_url` is not an absolute URL
    /// - `ConfigError::HttpClient` if the HTTP client cannot be built
    pub fn new(base_url: &str, pat_token: SecretString) -> Result<Self, ConfigError> {
        Self::with_timeout(base_url, pat_token, FETCH_TIMEOUT)
    }

    pub(crate) fn with_timeout(
        base_url: &str,
        pat_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidApiBaseUrl(format!("'{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidApiBaseUrl(format!(
                "'{base_url}' cannot be used as a base URL"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                error!(target: "exporter.services.ado_client", error = %e, "Failed to build HTTP client");
                ConfigError::HttpClient(e.to_string())
            })?;

        Ok(Self {
            client,
            base_url,
            pat_token,
        })
    }

    /// URL of the metrics endpoint for one target. Path parts are percent-encoded.
    pub fn metrics_url(&self, target: &MonitoredBuild) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::RequestBuild(format!("cannot extend '{}'", self.base_url)))?
            .pop_if_empty()
            .extend([
                target.organization.as_str(),
                target.project.as_str(),
                "_apis",
                "build",
                "definitions",
                target.definition.as_str(),
                "metrics",
            ]);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    /// Fetch the metrics of one build definition.
    ///
    /// # Errors
    ///
    /// - `FetchError::RequestBuild` if the URL cannot be built
    /// - `FetchError::Transport` on connect, timeout, or body read failure
    /// - `FetchError::UnexpectedStatus` for status codes outside 200..=203
    /// - `FetchError::Decode` if the body is not a metrics payload
    #[instrument(skip_all, name = "exporter.ado.fetch", fields(build = %target))]
    pub async fn fetch(&self, target: &MonitoredBuild) -> Result<BuildMetricsResponse, FetchError> {
        let url = self.metrics_url(target)?;

        let response = self
            .client
            .get(url)
            .basic_auth(BASIC_AUTH_USER, Some(self.pat_token.expose_secret()))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status().as_u16();
        if !ACCEPTED_STATUS.contains(&status) {
            return Err(FetchError::UnexpectedStatus(status));
        }

        let body = response.bytes().await.map_err(FetchError::Transport)?;
        let metrics: BuildMetricsResponse =
            serde_json::from_slice(&body).map_err(FetchError::Decode)?;

        debug!(
            target: "exporter.services.ado_client",
            count = metrics.count,
            samples = metrics.value.len(),
            "Fetched build metrics"
        );

        Ok(metrics)
    }
}

#[async_trait::async_trait]
impl BuildMetricsClient for AdoClient {
    async fn fetch_build_metrics(
        &self,
        target: &MonitoredBuild,
    ) -> Result<BuildMetricsResponse, FetchError> {
        self.fetch(target).await
    }
}

/// Mock build metrics client module for testing.
///
/// This module provides a scripted client for poller tests that do not need
/// an HTTP server.
pub mod mock {

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted reply for one target.
    #[derive(Debug, Clone)]
    pub enum MockReply {
        /// Return this payload.
        Metrics(BuildMetricsResponse),
        /// Fail with this status code.
        Status(u16),
        /// Fail as if the body were not JSON.
        Garbage,
    }

    /// Mock client returning a fixed reply per target.
    ///
    /// Targets without a scripted reply return an empty payload.
    #[derive(Default)]
    pub struct MockBuildMetricsClient {
        replies: HashMap<String, MockReply>,
        call_count: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl MockBuildMetricsClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the reply for a target given in joined form.
        pub fn with_reply(mut self, target: &str, reply: MockReply) -> Self {
            self.replies.insert(target.to_string(), reply);
            self
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Targets fetched so far, in call order.
        pub fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait::async_trait]
    impl BuildMetricsClient for MockBuildMetricsClient {
        async fn fetch_build_metrics(
            &self,
            target: &MonitoredBuild,
        ) -> Result<BuildMetricsResponse, FetchError> {
            let joined = target.target();
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(joined.clone());

            match self.replies.get(&joined) {
                Some(MockReply::Metrics(response)) => Ok(response.clone()),
                Some(MockReply::Status(status)) => Err(FetchError::UnexpectedStatus(*status)),
                Some(MockReply::Garbage) => {
                    serde_json::from_str::<BuildMetricsResponse>("not json")
                        .map_err(FetchError::Decode)
                }
                None => Ok(BuildMetricsResponse::default()),
            }
        }
    }
}
