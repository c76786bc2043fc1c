//! Presence propagation scenarios.

use pretty_assertions::assert_eq;

use realtime_server::application::services::PresenceTransition;
use realtime_server::domain::{DeliveryTarget, RealtimeEvent};

use crate::common::Harness;

const ALICE: i64 = 1;
const BOB: i64 = 2;

fn presence_events(harness: &Harness, connection_id: &str) -> Vec<RealtimeEvent> {
    harness
        .bus
        .events_for(connection_id)
        .into_iter()
        .filter(|e| matches!(e, RealtimeEvent::PresenceUpdate(_)))
        .collect()
}

#[tokio::test]
async fn test_multi_device_announces_once_each_way() {
    let harness = Harness::new();
    let presence = &harness.services.presence;
    harness.contacts.add(ALICE, BOB);

    presence.on_connect(BOB, "bob").await.unwrap();
    harness.bus.clear();

    assert_eq!(
        presence.on_connect(ALICE, "s1").await.unwrap(),
        PresenceTransition::CameOnline
    );
    assert_eq!(
        presence.on_connect(ALICE, "s2").await.unwrap(),
        PresenceTransition::Unchanged
    );
    assert_eq!(
        presence_events(&harness, "bob"),
        vec![RealtimeEvent::presence(ALICE, true)]
    );

    harness.bus.clear();
    assert_eq!(
        presence.on_disconnect("s1").await.unwrap(),
        PresenceTransition::Unchanged
    );
    assert!(harness.bus.deliveries().is_empty());

    assert_eq!(
        presence.on_disconnect("s2").await.unwrap(),
        PresenceTransition::WentOffline
    );
    let deliveries = harness.bus.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].target, DeliveryTarget::All);
    assert_eq!(deliveries[0].event, RealtimeEvent::presence(ALICE, false));
}

#[tokio::test]
async fn test_online_is_contact_scoped_offline_is_global() {
    let harness = Harness::new();
    let presence = &harness.services.presence;
    // Bob added Alice, Alice did not add Bob
    harness.contacts.add(BOB, ALICE);

    presence.on_connect(BOB, "bob").await.unwrap();
    harness.bus.clear();

    presence.on_connect(ALICE, "alice").await.unwrap();
    assert!(presence_events(&harness, "bob").is_empty());

    presence.on_disconnect("alice").await.unwrap();
    assert_eq!(
        presence_events(&harness, "bob"),
        vec![RealtimeEvent::presence(ALICE, false)]
    );
}

#[tokio::test]
async fn test_offline_marker_written_and_cleared() {
    let harness = Harness::new();
    let presence = &harness.services.presence;

    presence.on_connect(ALICE, "alice").await.unwrap();
    presence.on_disconnect("alice").await.unwrap();
    assert_eq!(harness.store.text("presence:1").as_deref(), Some("offline"));
    assert_eq!(harness.store.ttl("presence:1"), Some(60));

    presence.on_connect(ALICE, "alice-again").await.unwrap();
    assert!(!harness.store.contains("presence:1"));
}

#[tokio::test]
async fn test_status_reports_devices_and_visibility() {
    let harness = Harness::new();
    let presence = &harness.services.presence;

    presence.on_connect(ALICE, "a1").await.unwrap();
    presence.on_connect(ALICE, "a2").await.unwrap();
    harness.services.registry.set_visible("a1", false).await.unwrap();

    let status = presence.status(ALICE).await.unwrap();
    assert!(status.online);
    assert!(status.visible);
    assert_eq!(status.devices, 2);

    let offline = presence.status(BOB).await.unwrap();
    assert!(!offline.online);
    assert!(!offline.visible);
}
