//! Data models for the exporter.
//!
//! Polling targets parsed from configuration and the payload returned by the
//! Azure DevOps build definition metrics API.

use crate::config::ConfigError;
use crate::errors::FetchError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// One polling target: an `org/project/definition` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitoredBuild {
    pub organization: String,
    pub project: String,
    pub definition: String,
}

impl MonitoredBuild {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            definition: definition.into(),
        }
    }

    /// Joined `org/project/definition` form, used as the `target` label.
    pub fn target(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MonitoredBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.organization, self.project, self.definition)
    }
}

impl FromStr for MonitoredBuild {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split('/').collect();
        match parts.as_slice() {
            [organization, project, definition]
                if !organization.is_empty() && !project.is_empty() && !definition.is_empty() =>
            {
                Ok(Self::new(*organization, *project, *definition))
            }
            _ => Err(ConfigError::MalformedTarget(raw.to_string())),
        }
    }
}

/// Parse every configured target, failing on the first malformed entry.
pub fn parse_targets<S: AsRef<str>>(raw: &[S]) -> Result<Vec<MonitoredBuild>, ConfigError> {
    raw.iter().map(|entry| entry.as_ref().parse()).collect()
}

/// Response body of the build definition metrics endpoint.
///
/// Missing and `null` fields both decode to their zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildMetricsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub value: Vec<BuildMetricSample>,
}

/// One time-stamped measurement for a build definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetricSample {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub scope: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub int_value: i64,

    /// Empty for metrics the API reports without a date.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Result of one poll attempt. Folded into the metrics, never stored.
pub type FetchOutcome = Result<BuildMetricsResponse, FetchError>;
