//! Connection lifecycle scenarios.

use pretty_assertions::assert_eq;
use serde_json::json;

use realtime_server::application::services::{
    ConnectionLifecycle, HandshakeCredentials, InboundEvent,
};
use realtime_server::domain::{Identity, RealtimeEvent, RejectReason};

use crate::common::{story_request, token_for, token_with, Harness};

fn lifecycle(harness: &Harness) -> ConnectionLifecycle {
    ConnectionLifecycle::new(harness.services.clone())
}

fn query_token(token: String) -> HandshakeCredentials {
    HandshakeCredentials {
        query_token: Some(token),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_identify_token_wins_over_query_and_header() {
    let harness = Harness::new();
    let credentials = HandshakeCredentials {
        auth_token: Some(token_for(1)),
        query_token: Some(token_for(2)),
        header_token: Some(token_for(3)),
    };

    let ctx = lifecycle(&harness).connect("c1", &credentials).await.unwrap();

    assert_eq!(ctx.identity, Identity::Authenticated(1));
    assert_eq!(harness.services.registry.list(1).await.unwrap(), vec!["c1".to_string()]);
    assert!(harness.services.registry.list(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_token_connects_without_registration() {
    let harness = Harness::new();

    let ctx = lifecycle(&harness)
        .connect("c1", &query_token(token_with("4", -3600)))
        .await
        .unwrap();

    assert_eq!(ctx.identity, Identity::Rejected(RejectReason::TokenExpired));
    assert_eq!(harness.services.registry.count(4).await.unwrap(), 0);
    assert!(!harness.store.contains("socket:c1"));
}

#[tokio::test]
async fn test_session_round_trip() {
    let harness = Harness::new();
    let lifecycle = lifecycle(&harness);
    harness.contacts.befriend(1, 2);

    let friend = lifecycle.connect("friend", &query_token(token_for(2))).await.unwrap();
    let ctx = lifecycle.connect("me", &query_token(token_for(1))).await.unwrap();

    let ack = lifecycle
        .handle(&ctx, InboundEvent::parse("visibility", json!({"visible": false})))
        .await;
    assert_eq!(ack, None);
    assert!(!harness.services.registry.any_visible(1).await.unwrap());

    let ack = lifecycle
        .handle(&ctx, InboundEvent::StoryNew(story_request()))
        .await
        .unwrap();
    assert_eq!(ack["status"], json!("success"));
    assert_eq!(ack["recipients"], json!(["2"]));

    lifecycle.disconnect(&ctx).await;
    lifecycle.disconnect(&ctx).await;
    assert_eq!(harness.services.registry.count(1).await.unwrap(), 0);

    let offline: Vec<RealtimeEvent> = harness
        .bus
        .events_for(&friend.connection_id)
        .into_iter()
        .filter(|e| *e == RealtimeEvent::presence(1, false))
        .collect();
    assert_eq!(offline.len(), 1);
}

#[tokio::test]
async fn test_story_validation_errors_are_acknowledged() {
    let harness = Harness::new();
    let lifecycle = lifecycle(&harness);
    let ctx = lifecycle.connect("me", &query_token(token_for(1))).await.unwrap();

    let ack = lifecycle
        .handle(&ctx, InboundEvent::parse("story:new", json!({"caption": "no media"})))
        .await;
    assert_eq!(ack, Some(json!({"status": "error", "error": "media_required"})));

    let ack = lifecycle
        .handle(
            &ctx,
            InboundEvent::parse(
                "story:new",
                json!({"media": {
                    "resourceType": "gif",
                    "url": "https://res.cloudinary.com/a.gif",
                    "publicId": "a"
                }}),
            ),
        )
        .await;
    assert_eq!(
        ack,
        Some(json!({"status": "error", "error": "unsupported_media_type"}))
    );
    assert!(harness.stories.all().is_empty());
}

#[tokio::test]
async fn test_contact_outage_does_not_block_connect() {
    let harness = Harness::new();
    let lifecycle = lifecycle(&harness);
    harness.contacts.fail_lookups();

    let ctx = lifecycle.connect("c1", &query_token(token_for(5))).await.unwrap();

    assert_eq!(ctx.identity, Identity::Authenticated(5));
    assert_eq!(harness.services.registry.list(5).await.unwrap(), vec!["c1".to_string()]);

    lifecycle.disconnect(&ctx).await;
    assert_eq!(harness.services.registry.count(5).await.unwrap(), 0);
    assert_eq!(
        harness.bus.events_for("anyone"),
        vec![RealtimeEvent::presence(5, false)]
    );
}

#[tokio::test]
async fn test_failed_registration_leaves_no_session() {
    let harness = Harness::new();
    harness.store.fail_hash_writes();

    let result = lifecycle(&harness)
        .connect("c1", &query_token(token_for(5)))
        .await;

    assert!(result.unwrap_err().is_store_unavailable());
    assert_eq!(harness.services.registry.count(5).await.unwrap(), 0);
    assert!(!harness.store.contains("user:5:sockets"));
    assert!(harness.bus.deliveries().is_empty());
}

