//! Health and metrics endpoint tests

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let server = TestApp::new().server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let server = TestApp::new().server();

    let response = server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let server = TestApp::new().server();

    let response = server.get("/health/ready").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["database"]["status"], "unhealthy");
    assert_eq!(body["checks"]["redis"]["status"], "disabled");
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let server = TestApp::new().server();

    let response = server.get("/health").await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert_eq!(response.header("cache-control"), "no-store");
    // HSTS is production-only
    assert!(response.maybe_header("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_metrics_exposes_request_counter() {
    let server = TestApp::new().server();

    server.get("/health/live").await.assert_status_ok();
    let response = server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("http_requests_total"));
}
