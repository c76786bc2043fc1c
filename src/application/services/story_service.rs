//! Story Service
//!
//! Validates, persists and distributes stories to the author's mutual
//! contacts, and serves the active story feed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use super::session_registry::SessionRegistry;
use crate::application::dto::{MediaInput, StoryNewRequest};
use crate::config::StorySettings;
use crate::domain::{
    ContactRepository, Delivery, MediaDescriptor, MediaPolicy, NewStory, RealtimeEvent,
    ResourceType, Story, StoryIncoming, StoryRepository,
};
use crate::infrastructure::cache::EventBus;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Story posting errors. Each maps to a stable wire code.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Media is required")]
    MediaRequired,

    #[error("Media URL is not hosted on the approved domain")]
    InvalidMediaUrl,

    #[error("Unsupported media type")]
    UnsupportedMediaType,

    #[error("Caption exceeds {0} characters")]
    CaptionTooLong(usize),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl StoryError {
    pub fn code(&self) -> &'static str {
        match self {
            StoryError::Unauthenticated => "unauthenticated",
            StoryError::MediaRequired => "media_required",
            StoryError::InvalidMediaUrl => "invalid_media_url",
            StoryError::UnsupportedMediaType => "unsupported_media_type",
            StoryError::CaptionTooLong(_) => "caption_too_long",
            StoryError::Store(_) => "internal_error",
        }
    }
}

/// A persisted story and the users it was pushed to.
#[derive(Debug, Clone)]
pub struct StoryPosted {
    pub story: Story,
    pub recipients: Vec<i64>,
}

/// Story fan-out engine.
#[derive(Clone)]
pub struct StoryService {
    registry: SessionRegistry,
    contacts: Arc<dyn ContactRepository>,
    stories: Arc<dyn StoryRepository>,
    bus: Arc<dyn EventBus>,
    id_generator: Arc<SnowflakeGenerator>,
    policy: MediaPolicy,
    ttl: Duration,
    max_caption_length: usize,
}

impl StoryService {
    pub fn new(
        registry: SessionRegistry,
        contacts: Arc<dyn ContactRepository>,
        stories: Arc<dyn StoryRepository>,
        bus: Arc<dyn EventBus>,
        id_generator: Arc<SnowflakeGenerator>,
        settings: &StorySettings,
    ) -> Self {
        Self {
            registry,
            contacts,
            stories,
            bus,
            id_generator,
            policy: MediaPolicy::new(settings.allowed_media_host.clone()),
            ttl: Duration::hours(settings.ttl_hours),
            max_caption_length: settings.max_caption_length,
        }
    }

    /// Handle `story:new`. Validation failures persist nothing.
    #[instrument(skip(self, request))]
    pub async fn post(
        &self,
        author: Option<i64>,
        request: StoryNewRequest,
    ) -> Result<StoryPosted, StoryError> {
        let result = self.try_post(author, request).await;
        match &result {
            Ok(posted) => {
                metrics::record_story_post("success");
                info!(
                    story_id = posted.story.id,
                    recipients = posted.recipients.len(),
                    "Story posted"
                );
            }
            Err(StoryError::Store(e)) if e.is_store_unavailable() => {
                metrics::record_story_post("internal_error");
                warn!(error = %e, "Story post failed, store unavailable");
            }
            Err(StoryError::Store(e)) => {
                metrics::record_story_post("internal_error");
                error!(error = %e, "Story post failed");
            }
            Err(e) => {
                metrics::record_story_post(e.code());
                debug!(error = %e, "Story rejected");
            }
        }
        result
    }

    async fn try_post(
        &self,
        author: Option<i64>,
        request: StoryNewRequest,
    ) -> Result<StoryPosted, StoryError> {
        let author = author.ok_or(StoryError::Unauthenticated)?;
        let (media, caption) = self.validate(request)?;

        let reverse = self.contacts.find_reverse_contacts(author).await?;
        let mutual = if reverse.is_empty() {
            Vec::new()
        } else {
            self.contacts.find_mutual_contacts(author, &reverse).await?
        };

        let new_story = NewStory::new(
            self.id_generator.generate(),
            author,
            media,
            caption,
            Utc::now(),
            self.ttl,
        );
        let story = self.stories.create(&new_story).await?;

        // The story is stored; live delivery is best effort from here on
        let recipients = match self.fan_out(&story, &mutual).await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!(story_id = story.id, error = %e, "Story fan-out failed");
                Vec::new()
            }
        };

        Ok(StoryPosted { story, recipients })
    }

    /// Push `story:incoming` to every connection of the given users and
    /// return the users that had at least one.
    async fn fan_out(&self, story: &Story, users: &[i64]) -> Result<Vec<i64>, AppError> {
        let mut recipients = Vec::new();
        let mut connections = Vec::new();
        for (user_id, ids) in self.registry.resolve(users).await? {
            recipients.push(user_id);
            connections.extend(ids);
        }

        if connections.is_empty() {
            return Ok(recipients);
        }
        let event = RealtimeEvent::StoryIncoming(StoryIncoming {
            story: story.clone(),
        });
        self.bus
            .publish(&Delivery::to_connections(connections, event))
            .await?;
        Ok(recipients)
    }

    /// Checks run in order: media presence, host, type, caption length.
    fn validate(&self, request: StoryNewRequest) -> Result<(MediaDescriptor, String), StoryError> {
        let media = request.media.ok_or(StoryError::MediaRequired)?;
        media.validate().map_err(|_| StoryError::MediaRequired)?;
        let MediaInput {
            resource_type: Some(resource_type),
            url: Some(url),
            public_id: Some(public_id),
            thumb_url,
        } = media
        else {
            return Err(StoryError::MediaRequired);
        };

        if !self.policy.is_allowed(&url) {
            return Err(StoryError::InvalidMediaUrl);
        }

        let resource_type =
            ResourceType::parse(&resource_type).ok_or(StoryError::UnsupportedMediaType)?;

        let caption = request.caption.unwrap_or_default();
        if caption.chars().count() > self.max_caption_length {
            return Err(StoryError::CaptionTooLong(self.max_caption_length));
        }

        Ok((
            MediaDescriptor {
                url,
                thumb_url,
                resource_type,
                public_id,
            },
            caption,
        ))
    }

    /// Unexpired stories of the viewer and the viewer's mutual contacts,
    /// newest first.
    #[instrument(skip(self))]
    pub async fn active_feed(&self, viewer_id: i64, limit: usize) -> Result<Vec<Story>, AppError> {
        let mut owners = self.mutual_contacts(viewer_id).await?;
        owners.push(viewer_id);

        let mut stories = self
            .stories
            .find_active_by_owners(&owners, Utc::now())
            .await?;
        stories.truncate(limit);
        Ok(stories)
    }

    /// Record that `viewer_id` saw a story. The viewer must be the owner or
    /// a mutual contact of the owner, and the story must still be active.
    #[instrument(skip(self))]
    pub async fn record_view(&self, viewer_id: i64, story_id: i64) -> Result<(), AppError> {
        let story = self
            .stories
            .find_by_id(story_id)
            .await?
            .filter(Story::is_active)
            .ok_or_else(|| AppError::NotFound("Story not found".into()))?;

        if story.owner_id != viewer_id && !self.are_mutual(viewer_id, story.owner_id).await? {
            return Err(AppError::Forbidden("Story is not shared with you".into()));
        }

        if !self.stories.add_viewer(story_id, viewer_id).await? {
            return Err(AppError::NotFound("Story not found".into()));
        }
        debug!("Story view recorded");
        Ok(())
    }

    async fn mutual_contacts(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let reverse = self.contacts.find_reverse_contacts(user_id).await?;
        if reverse.is_empty() {
            return Ok(Vec::new());
        }
        self.contacts.find_mutual_contacts(user_id, &reverse).await
    }

    async fn are_mutual(&self, a: i64, b: i64) -> Result<bool, AppError> {
        let forward = self.contacts.find_mutual_contacts(a, &[b]).await?;
        if forward.is_empty() {
            return Ok(false);
        }
        let backward = self.contacts.find_mutual_contacts(b, &[a]).await?;
        Ok(!backward.is_empty())
    }
}
