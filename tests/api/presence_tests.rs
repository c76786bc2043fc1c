//! Presence API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{token_for, TestApp};

#[tokio::test]
async fn test_presence_requires_token() {
    let app = TestApp::new();

    app.server
        .get("/api/v1/presence/1")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_presence_reports_devices() {
    let app = TestApp::new();
    let presence = &app.state.realtime.presence;
    presence.on_connect(5, "phone").await.unwrap();
    presence.on_connect(5, "laptop").await.unwrap();

    let response = app
        .server
        .get("/api/v1/presence/5")
        .authorization_bearer(token_for(1))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json,
        json!({"userId": "5", "online": true, "visible": true, "devices": 2})
    );
}

#[tokio::test]
async fn test_presence_of_offline_user() {
    let app = TestApp::new();

    let json: Value = app
        .server
        .get("/api/v1/presence/9")
        .authorization_bearer(token_for(1))
        .await
        .json();

    assert_eq!(json["online"], false);
    assert_eq!(json["devices"], 0);
}
