//! Azure DevOps API fixtures for `wiremock`.

use ado_exporter::models::BuildMetricSample;
use ado_exporter::observability::ExporterMetrics;
use ado_exporter::services::AdoClient;
use ado_exporter::tasks::MetricsPoller;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// PAT used by every fixture client.
pub const TEST_PAT: &str = "test-pat";

/// `Authorization` header the API receives for `TEST_PAT`.
pub const TEST_BASIC_AUTH: &str = "Basic dXNlcjp0ZXN0LXBhdA==";

/// Build a sample the way the API reports it.
pub fn sample(name: &str, scope: &str, int_value: i64, date: &str) -> BuildMetricSample {
    BuildMetricSample {
        name: name.to_string(),
        scope: scope.to_string(),
        int_value,
        date: date.to_string(),
    }
}

/// Wire-format response body for the given samples.
pub fn metrics_body(samples: &[BuildMetricSample]) -> Value {
    json!({
        "count": samples.len(),
        "value": samples
            .iter()
            .map(|s| json!({
                "name": s.name,
                "scope": s.scope,
                "intValue": s.int_value,
                "date": s.date,
            }))
            .collect::<Vec<_>>(),
    })
}

/// Request path of the metrics endpoint for a joined `org/project/definition`.
///
/// # Panics
///
/// Panics if `target` does not have three parts.
pub fn metrics_path(target: &str) -> String {
    let parts: Vec<&str> = target.split('/').collect();
    assert_eq!(parts.len(), 3, "fixture target must be org/project/definition");
    format!(
        "/{}/{}/_apis/build/definitions/{}/metrics",
        parts[0], parts[1], parts[2]
    )
}

/// A GET matcher for one target's metrics endpoint.
pub fn build_metrics_mock(target: &str, response: ResponseTemplate) -> Mock {
    Mock::given(method("GET"))
        .and(path(metrics_path(target)))
        .and(query_param("api-version", "5.1-preview.1"))
        .respond_with(response)
}

/// Mount a 200 reply with `samples` for `target`.
pub async fn mount_build_metrics(server: &MockServer, target: &str, samples: &[BuildMetricSample]) {
    build_metrics_mock(
        target,
        ResponseTemplate::new(200).set_body_json(metrics_body(samples)),
    )
    .mount(server)
    .await;
}

/// Azure DevOps client pointed at a mock server.
pub fn client_for(server: &MockServer) -> AdoClient {
    AdoClient::new(&server.uri(), SecretString::from(TEST_PAT))
        .expect("mock server URI should be a valid base URL")
}

/// Poller over `builds` that talks to a mock server.
pub fn poller_for(server: &MockServer, builds: &[&str], metrics: ExporterMetrics) -> MetricsPoller {
    MetricsPoller::new(
        Arc::new(client_for(server)),
        metrics,
        builds.iter().map(|b| b.to_string()).collect(),
    )
}
