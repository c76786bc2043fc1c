//! Call signaling scenarios.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use realtime_server::application::dto::CallSignalRequest;
use realtime_server::application::services::{DropReason, SignalOutcome};
use realtime_server::domain::{CallKind, CallState, CallTransitionError, RealtimeEvent, SignalKind};

use crate::common::{test_settings, Harness};

const CALLER: i64 = 100;
const CALLEE: i64 = 200;
const STRANGER: i64 = 300;

fn request(to: i64, call_id: Uuid) -> CallSignalRequest {
    CallSignalRequest {
        to,
        call_id,
        kind: Some(CallKind::Audio),
        payload: Some(json!({"sdp": "v=0"})),
    }
}

async fn connected(harness: &Harness) {
    harness.services.registry.register(CALLER, "caller").await.unwrap();
    harness.services.registry.register(CALLEE, "callee").await.unwrap();
}

#[tokio::test]
async fn test_offer_to_offline_user_is_dropped_and_forgotten() {
    let harness = Harness::new();
    let signaling = &harness.services.signaling;
    let call_id = Uuid::new_v4();

    let outcome = signaling
        .relay(CALLER, SignalKind::Offer, request(CALLEE, call_id))
        .await
        .unwrap();
    assert_eq!(outcome, SignalOutcome::Dropped(DropReason::CalleeOffline));
    assert!(signaling.load(call_id).await.unwrap().is_none());

    // The callee connecting later receives nothing
    harness.services.registry.register(CALLEE, "callee").await.unwrap();
    assert!(harness.bus.events_for("callee").is_empty());
}

#[tokio::test]
async fn test_full_call_flow() {
    let harness = Harness::new();
    let signaling = &harness.services.signaling;
    connected(&harness).await;
    let call_id = Uuid::new_v4();

    signaling
        .relay(CALLER, SignalKind::Offer, request(CALLEE, call_id))
        .await
        .unwrap();
    let callee_events = harness.bus.events_for("callee");
    assert_eq!(callee_events.len(), 2);
    match &callee_events[..] {
        [RealtimeEvent::CallIncoming(incoming), RealtimeEvent::CallOffer(offer)] => {
            assert_eq!(incoming.from, CALLER.to_string());
            assert_eq!(incoming.kind, Some(CallKind::Audio));
            assert_eq!(offer.payload, Some(json!({"sdp": "v=0"})));
        }
        other => panic!("unexpected events: {:?}", other),
    }

    let answered = signaling
        .relay(CALLEE, SignalKind::Answer, request(CALLER, call_id))
        .await
        .unwrap();
    assert_eq!(answered, SignalOutcome::Relayed { connections: 1 });
    assert_eq!(
        signaling.load(call_id).await.unwrap().unwrap().state,
        CallState::Connected
    );

    signaling
        .relay(CALLER, SignalKind::IceCandidate, request(CALLEE, call_id))
        .await
        .unwrap();
    signaling
        .relay(CALLEE, SignalKind::End, request(CALLER, call_id))
        .await
        .unwrap();
    assert_eq!(
        signaling.load(call_id).await.unwrap().unwrap().state,
        CallState::Ended
    );

    let caller_events: Vec<&'static str> = harness
        .bus
        .events_for("caller")
        .iter()
        .map(RealtimeEvent::event_name)
        .collect();
    assert_eq!(caller_events, vec!["call:answer", "call:end"]);
}

#[tokio::test]
async fn test_sender_identity_is_enforced() {
    let harness = Harness::new();
    let signaling = &harness.services.signaling;
    connected(&harness).await;
    let call_id = Uuid::new_v4();

    signaling
        .relay(CALLER, SignalKind::Offer, request(CALLEE, call_id))
        .await
        .unwrap();

    let outcome = signaling
        .relay(STRANGER, SignalKind::Answer, request(CALLER, call_id))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SignalOutcome::Dropped(DropReason::Rejected(CallTransitionError::NotParticipant(STRANGER)))
    );

    let outcome = signaling
        .relay(CALLER, SignalKind::Answer, request(CALLEE, call_id))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SignalOutcome::Dropped(DropReason::Rejected(CallTransitionError::NotCallee))
    );
}

#[tokio::test]
async fn test_reused_call_id_is_rejected() {
    let harness = Harness::new();
    let signaling = &harness.services.signaling;
    connected(&harness).await;
    let call_id = Uuid::new_v4();

    signaling
        .relay(CALLER, SignalKind::Offer, request(CALLEE, call_id))
        .await
        .unwrap();
    let again = signaling
        .relay(CALLER, SignalKind::Offer, request(CALLEE, call_id))
        .await
        .unwrap();

    assert_eq!(again, SignalOutcome::Dropped(DropReason::CallExists));
    assert_eq!(harness.bus.events_for("callee").len(), 2);
}

#[tokio::test]
async fn test_self_call_is_dropped() {
    let harness = Harness::new();
    connected(&harness).await;

    let outcome = harness
        .services
        .signaling
        .relay(CALLER, SignalKind::Offer, request(CALLER, Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(outcome, SignalOutcome::Dropped(DropReason::SelfCall));
}

#[tokio::test]
async fn test_unanswered_call_times_out() {
    let mut settings = test_settings();
    settings.calls.ring_timeout_secs = 0;
    let harness = Harness::with_settings(settings);
    connected(&harness).await;
    let call_id = Uuid::new_v4();

    harness
        .services
        .signaling
        .relay(CALLER, SignalKind::Offer, request(CALLEE, call_id))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let session = harness.services.signaling.load(call_id).await.unwrap().unwrap();
    assert_eq!(session.state, CallState::Timeout);

    for (connection, peer) in [("caller", CALLEE), ("callee", CALLER)] {
        let ended: Vec<RealtimeEvent> = harness
            .bus
            .events_for(connection)
            .into_iter()
            .filter(|e| matches!(e, RealtimeEvent::CallEnd(_)))
            .collect();
        match &ended[..] {
            [RealtimeEvent::CallEnd(signal)] => {
                assert_eq!(signal.reason.as_deref(), Some("timeout"));
                assert_eq!(signal.from, peer.to_string());
            }
            other => panic!("unexpected events for {}: {:?}", connection, other),
        }
    }
}

#[tokio::test]
async fn test_answered_call_does_not_time_out() {
    let harness = Harness::new();
    let signaling = &harness.services.signaling;
    connected(&harness).await;
    let call_id = Uuid::new_v4();

    signaling
        .relay(CALLER, SignalKind::Offer, request(CALLEE, call_id))
        .await
        .unwrap();
    signaling
        .relay(CALLEE, SignalKind::Answer, request(CALLER, call_id))
        .await
        .unwrap();

    assert!(!signaling.expire(call_id).await.unwrap());
    assert_eq!(
        signaling.load(call_id).await.unwrap().unwrap().state,
        CallState::Connected
    );
}
