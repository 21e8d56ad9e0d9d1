//! HTTP endpoint integration tests.
//!
//! Tests `/metrics`, `/health` and `/ready` using the `TestExporterServer` harness.

use exporter_test_utils::{find_sample, mount_build_metrics, poller_for, sample, TestExporterServer};
use wiremock::MockServer;

/// Test that the scrape endpoint returns Prometheus text.
#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_text() -> Result<(), anyhow::Error> {
    let server = TestExporterServer::spawn().await?;
    server.metrics().set_build_info("0.0.0-test");

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert!(
        content_type.as_deref().is_some_and(|ct| ct.starts_with("text/plain")),
        "Expected text/plain content type, got {:?}",
        content_type
    );

    let body = response.text().await?;
    assert_eq!(
        find_sample(&body, "ado_exporter_build_info", &[("version", "0.0.0-test")]),
        Some(1.0)
    );

    Ok(())
}

/// Test that a sweep shows up in the next scrape.
#[tokio::test]
async fn test_scrape_reflects_latest_sweep() -> Result<(), anyhow::Error> {
    let ado = MockServer::start().await;
    mount_build_metrics(
        &ado,
        "contoso/web/42",
        &[sample("TotalBuilds", "refs/heads/main", 42, "2024-03-01T00:00:00Z")],
    )
    .await;

    let server = TestExporterServer::spawn().await?;
    let poller = poller_for(&ado, &["contoso/web/42"], server.metrics().clone())
        .with_health(server.health().clone());
    poller
        .run_sweep()
        .await
        .map_err(|e| anyhow::anyhow!("sweep failed: {e}"))?;

    let body = server.scrape().await?;
    assert_eq!(
        find_sample(
            &body,
            "build_fetch_requests_total",
            &[
                ("org", "contoso"),
                ("project", "web"),
                ("definition", "42"),
                ("success", "1"),
            ]
        ),
        Some(1.0)
    );
    assert_eq!(
        find_sample(
            &body,
            "build_metric_value",
            &[
                ("target", "contoso/web/42"),
                ("name", "TotalBuilds"),
                ("scope", "refs/heads/main"),
                ("date", "2024-03-01T00:00:00Z"),
            ]
        ),
        Some(42.0)
    );

    Ok(())
}

/// Test that readiness waits for the first sweep.
#[tokio::test]
async fn test_ready_after_first_sweep() -> Result<(), anyhow::Error> {
    let ado = MockServer::start().await;
    mount_build_metrics(&ado, "o/p/1", &[]).await;

    let server = TestExporterServer::spawn().await?;
    let ready_url = format!("{}/ready", server.url());

    assert_eq!(reqwest::get(&ready_url).await?.status(), 503);

    poller_for(&ado, &["o/p/1"], server.metrics().clone())
        .with_health(server.health().clone())
        .run_sweep()
        .await
        .map_err(|e| anyhow::anyhow!("sweep failed: {e}"))?;

    assert_eq!(reqwest::get(&ready_url).await?.status(), 200);

    server.health().set_not_ready();
    assert_eq!(reqwest::get(&ready_url).await?.status(), 503);

    Ok(())
}

/// Test that liveness is independent of readiness.
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestExporterServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that non-existent routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestExporterServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/v1/builds", server.url())).await?;
    assert_eq!(response.status(), 404);

    Ok(())
}

/// Test that the scrape exposes process series on platforms that report them.
#[tokio::test]
async fn test_scrape_includes_process_series() -> Result<(), anyhow::Error> {
    let server = TestExporterServer::spawn().await?;

    let body = server.scrape().await?;

    if ado_exporter::observability::ProcessCollector::new()
        .sample()
        .is_some()
    {
        assert!(body.contains("process_resident_memory_bytes"));
        assert!(body.contains("process_start_time_seconds"));
    }

    Ok(())
}
