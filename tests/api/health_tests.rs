//! Health Check API Tests

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    app.server.get("/health/live").await.assert_status_ok();
}

#[tokio::test]
async fn test_readiness_degrades_without_database() {
    let app = TestApp::new();

    let response = app.server.get("/health/ready").await;

    // The shared store is up, the lazily-connected database is not
    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["redis"]["status"], "healthy");
    assert_eq!(json["checks"]["database"]["status"], "unhealthy");
    assert_eq!(json["checks"]["websocket"]["active_connections"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_text_format() {
    let app = TestApp::new();
    app.server.get("/health").await.assert_status_ok();

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("realtime_server_http_requests_total"));
}
