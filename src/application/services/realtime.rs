//! Realtime service bundle
//!
//! Wires the registry, presence, story and signaling services over one set of
//! shared collaborators.

use std::sync::Arc;

use super::identity_service::TokenVerifier;
use super::presence_service::PresenceService;
use super::session_registry::SessionRegistry;
use super::signaling_service::SignalingService;
use super::story_service::StoryService;
use crate::config::Settings;
use crate::domain::{ContactRepository, StoryRepository};
use crate::infrastructure::cache::{EventBus, SharedStore};
use crate::shared::snowflake::SnowflakeGenerator;

/// Every realtime service, cheap to clone.
#[derive(Clone)]
pub struct RealtimeServices {
    pub registry: SessionRegistry,
    pub presence: PresenceService,
    pub stories: StoryService,
    pub signaling: SignalingService,
    pub verifier: TokenVerifier,
}

impl RealtimeServices {
    pub fn build(
        store: Arc<dyn SharedStore>,
        bus: Arc<dyn EventBus>,
        contacts: Arc<dyn ContactRepository>,
        story_repository: Arc<dyn StoryRepository>,
        id_generator: Arc<SnowflakeGenerator>,
        settings: &Settings,
    ) -> Self {
        let registry = SessionRegistry::new(store.clone());

        let presence = PresenceService::new(
            registry.clone(),
            store.clone(),
            contacts.clone(),
            bus.clone(),
            settings.presence.offline_marker_ttl_secs,
        );
        let stories = StoryService::new(
            registry.clone(),
            contacts,
            story_repository,
            bus.clone(),
            id_generator,
            &settings.stories,
        );
        let signaling = SignalingService::new(registry.clone(), store, bus, &settings.calls);

        Self {
            registry,
            presence,
            stories,
            signaling,
            verifier: TokenVerifier::new(&settings.jwt),
        }
    }
}
