//! Story fan-out scenarios.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use realtime_server::application::dto::MediaInput;
use realtime_server::application::services::StoryError;
use realtime_server::domain::{MediaDescriptor, RealtimeEvent, ResourceType, Story};
use realtime_server::shared::error::AppError;

use crate::common::{story_request, Harness};

const AUTHOR: i64 = 10;
const FRIEND: i64 = 20;
const FOLLOWER: i64 = 30;

fn incoming_count(harness: &Harness, connection_id: &str) -> usize {
    harness
        .bus
        .events_for(connection_id)
        .iter()
        .filter(|e| matches!(e, RealtimeEvent::StoryIncoming(_)))
        .count()
}

#[tokio::test]
async fn test_story_reaches_only_mutual_contacts() {
    let harness = Harness::new();
    let registry = &harness.services.registry;
    let stories = &harness.services.stories;

    harness.contacts.add(AUTHOR, FRIEND);
    registry.register(FRIEND, "friend").await.unwrap();

    let first = stories.post(Some(AUTHOR), story_request()).await.unwrap();
    assert!(first.recipients.is_empty());
    assert_eq!(incoming_count(&harness, "friend"), 0);

    harness.contacts.add(FRIEND, AUTHOR);
    let second = stories.post(Some(AUTHOR), story_request()).await.unwrap();
    assert_eq!(second.recipients, vec![FRIEND]);
    assert_eq!(incoming_count(&harness, "friend"), 1);

    match &harness.bus.events_for("friend")[..] {
        [RealtimeEvent::StoryIncoming(incoming)] => assert_eq!(incoming.story.id, second.story.id),
        other => panic!("unexpected events: {:?}", other),
    }
}

#[tokio::test]
async fn test_story_reaches_every_device_of_a_recipient() {
    let harness = Harness::new();
    harness.contacts.befriend(AUTHOR, FRIEND);
    harness.services.registry.register(FRIEND, "phone").await.unwrap();
    harness.services.registry.register(FRIEND, "laptop").await.unwrap();

    let posted = harness
        .services
        .stories
        .post(Some(AUTHOR), story_request())
        .await
        .unwrap();

    assert_eq!(posted.recipients, vec![FRIEND]);
    assert_eq!(incoming_count(&harness, "phone"), 1);
    assert_eq!(incoming_count(&harness, "laptop"), 1);
    assert_eq!(harness.bus.deliveries().len(), 1);
}

#[tokio::test]
async fn test_blocked_edge_is_not_mutual() {
    let harness = Harness::new();
    harness.contacts.add(AUTHOR, FRIEND);
    harness.contacts.add_blocked(FRIEND, AUTHOR);
    harness.services.registry.register(FRIEND, "friend").await.unwrap();

    let posted = harness
        .services
        .stories
        .post(Some(AUTHOR), story_request())
        .await
        .unwrap();

    assert!(posted.recipients.is_empty());
    assert_eq!(incoming_count(&harness, "friend"), 0);
}

#[tokio::test]
async fn test_foreign_media_host_persists_nothing() {
    let harness = Harness::new();
    harness.contacts.befriend(AUTHOR, FRIEND);

    let mut request = story_request();
    request.media = Some(MediaInput {
        url: Some("https://res.cloudinary.com.evil.example/x.jpg".into()),
        ..request.media.unwrap()
    });

    let err = harness
        .services
        .stories
        .post(Some(AUTHOR), request)
        .await
        .unwrap_err();

    assert!(matches!(err, StoryError::InvalidMediaUrl));
    assert_eq!(err.code(), "invalid_media_url");
    assert!(harness.stories.all().is_empty());
    assert!(harness.bus.deliveries().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_post_is_rejected() {
    let harness = Harness::new();
    let err = harness
        .services
        .stories
        .post(None, story_request())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "unauthenticated");
    assert!(harness.stories.all().is_empty());
}

#[tokio::test]
async fn test_feed_contains_own_and_mutual_stories_newest_first() {
    let harness = Harness::new();
    let stories = &harness.services.stories;
    harness.contacts.befriend(AUTHOR, FRIEND);
    harness.contacts.add(FOLLOWER, AUTHOR);

    let own = stories.post(Some(AUTHOR), story_request()).await.unwrap();
    let friends = stories.post(Some(FRIEND), story_request()).await.unwrap();
    stories.post(Some(FOLLOWER), story_request()).await.unwrap();

    let feed = stories.active_feed(AUTHOR, 50).await.unwrap();
    let ids: Vec<i64> = feed.iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&own.story.id));
    assert!(ids.contains(&friends.story.id));

    assert_eq!(stories.active_feed(AUTHOR, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_expired_stories_leave_the_feed() {
    let harness = Harness::new();
    let created_at = Utc::now() - Duration::hours(30);
    harness.stories.insert(Story {
        id: 99,
        owner_id: AUTHOR,
        media: MediaDescriptor {
            url: "https://res.cloudinary.com/demo/old.jpg".into(),
            thumb_url: None,
            resource_type: ResourceType::Image,
            public_id: "old".into(),
        },
        caption: String::new(),
        viewers: vec![],
        created_at,
        expires_at: created_at + Duration::hours(24),
    });

    let feed = harness.services.stories.active_feed(AUTHOR, 50).await.unwrap();
    assert!(feed.is_empty());

    let err = harness.services.stories.record_view(AUTHOR, 99).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_views_require_mutual_contact() {
    let harness = Harness::new();
    let stories = &harness.services.stories;
    harness.contacts.befriend(AUTHOR, FRIEND);
    harness.contacts.add(FOLLOWER, AUTHOR);

    let posted = stories.post(Some(AUTHOR), story_request()).await.unwrap();
    let id = posted.story.id;

    stories.record_view(FRIEND, id).await.unwrap();
    stories.record_view(FRIEND, id).await.unwrap();
    assert!(matches!(
        stories.record_view(FOLLOWER, id).await.unwrap_err(),
        AppError::Forbidden(_)
    ));

    let stored = harness.stories.all();
    assert_eq!(stored[0].viewers, vec![FRIEND]);
    assert!(stored[0].seen_by(FRIEND));
}

#[tokio::test]
async fn test_delivery_outage_still_acknowledges_stored_story() {
    let harness = Harness::new();
    harness.contacts.befriend(AUTHOR, FRIEND);
    harness.services.registry.register(FRIEND, "friend").await.unwrap();
    harness.bus.fail_publishes();

    let posted = harness
        .services
        .stories
        .post(Some(AUTHOR), story_request())
        .await
        .unwrap();

    assert!(posted.recipients.is_empty());
    assert_eq!(harness.stories.all().len(), 1);
    assert_eq!(harness.stories.all()[0].id, posted.story.id);

    // Missed live delivery is recovered through the feed
    let feed = harness.services.stories.active_feed(FRIEND, 50).await.unwrap();
    assert_eq!(feed.len(), 1);
}

#[tokio::test]
async fn test_contact_outage_before_persist_is_internal_error() {
    let harness = Harness::new();
    harness.contacts.fail_lookups();

    let err = harness
        .services
        .stories
        .post(Some(AUTHOR), story_request())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "internal_error");
    assert!(harness.stories.all().is_empty());
}

