//! Story API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{story_request, token_for, token_with, TestApp};

const AUTHOR: i64 = 10;
const FRIEND: i64 = 20;
const STRANGER: i64 = 30;

#[tokio::test]
async fn test_feed_rejects_expired_token() {
    let app = TestApp::new();

    app.server
        .get("/api/v1/stories")
        .authorization_bearer(token_with("10", -3600))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_feed_lists_mutual_stories() {
    let app = TestApp::new();
    app.contacts.befriend(AUTHOR, FRIEND);
    let posted = app
        .state
        .realtime
        .stories
        .post(Some(AUTHOR), story_request())
        .await
        .unwrap();

    let response = app
        .server
        .get("/api/v1/stories")
        .authorization_bearer(token_for(FRIEND))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    let stories = json["stories"].as_array().unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0]["id"], posted.story.id.to_string());
    assert_eq!(stories[0]["owner"], AUTHOR.to_string());

    let json: Value = app
        .server
        .get("/api/v1/stories")
        .authorization_bearer(token_for(STRANGER))
        .await
        .json();
    assert!(json["stories"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_feed_limit_is_validated() {
    let app = TestApp::new();

    app.server
        .get("/api/v1/stories")
        .add_query_param("limit", 0)
        .authorization_bearer(token_for(AUTHOR))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_record_view() {
    let app = TestApp::new();
    app.contacts.befriend(AUTHOR, FRIEND);
    let posted = app
        .state
        .realtime
        .stories
        .post(Some(AUTHOR), story_request())
        .await
        .unwrap();
    let path = format!("/api/v1/stories/{}/views", posted.story.id);

    app.server
        .post(&path)
        .authorization_bearer(token_for(FRIEND))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(app.stories.all()[0].viewers, vec![FRIEND]);

    app.server
        .post(&path)
        .authorization_bearer(token_for(STRANGER))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post("/api/v1/stories/12345/views")
        .authorization_bearer(token_for(FRIEND))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
