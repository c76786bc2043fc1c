//! Story entity and repository trait.
//!
//! Maps to the `stories` table:
//! - id: BIGINT PRIMARY KEY (snowflake)
//! - owner_id: BIGINT NOT NULL
//! - public_id: TEXT NOT NULL
//! - url: TEXT NOT NULL
//! - thumb_url: TEXT NULL
//! - resource_type: VARCHAR(10) NOT NULL ('image' | 'video')
//! - caption: TEXT NOT NULL DEFAULT ''
//! - viewers: BIGINT[] NOT NULL DEFAULT '{}'
//! - created_at: TIMESTAMPTZ NOT NULL
//! - expires_at: TIMESTAMPTZ NOT NULL
//!
//! Expiry is enforced by filtering `expires_at > now` at read time.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Kind of media attached to a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Video,
}

impl ResourceType {
    /// Parse the wire/database representation. Unknown kinds are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hosted media backing a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    pub resource_type: ResourceType,
    pub public_id: String,
}

/// A durable, time-boxed media post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(with = "id_as_string")]
    pub id: i64,
    #[serde(rename = "owner", with = "id_as_string")]
    pub owner_id: i64,
    pub media: MediaDescriptor,
    pub caption: String,
    #[serde(skip)]
    pub viewers: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Story {
    /// Whether the story is still visible at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    pub fn seen_by(&self, user_id: i64) -> bool {
        self.viewers.contains(&user_id)
    }
}

/// Fields required to persist a new story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    pub id: i64,
    pub owner_id: i64,
    pub media: MediaDescriptor,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewStory {
    pub fn new(
        id: i64,
        owner_id: i64,
        media: MediaDescriptor,
        caption: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id,
            owner_id,
            media,
            caption,
            created_at: now,
            expires_at: now + ttl,
        }
    }
}

/// Repository trait for Story persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Persist a story and return the stored row.
    async fn create(&self, story: &NewStory) -> Result<Story, AppError>;

    /// Unexpired stories of the given owners, newest first.
    async fn find_active_by_owners(
        &self,
        owner_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<Story>, AppError>;

    /// Find a story by id regardless of expiry.
    async fn find_by_id(&self, id: i64) -> Result<Option<Story>, AppError>;

    /// Add a viewer (set semantics). Returns false if the story does not exist.
    async fn add_viewer(&self, id: i64, viewer_id: i64) -> Result<bool, AppError>;
}

/// Snowflake ids travel as strings to stay exact in JavaScript clients.
mod id_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
