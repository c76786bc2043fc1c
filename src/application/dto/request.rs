//! Request DTOs
//!
//! Data structures for inbound WebSocket payloads and API query strings.

use serde::Deserialize;
use validator::Validate;

/// Media attached to a `story:new` event.
///
/// Every field is optional on the wire; presence is checked by validation so
/// that a missing field maps to `media_required` rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MediaInput {
    #[serde(alias = "resource_type")]
    #[validate(required, length(min = 1, message = "resourceType is required"))]
    pub resource_type: Option<String>,

    #[validate(required, length(min = 1, message = "url is required"))]
    pub url: Option<String>,

    #[serde(alias = "public_id")]
    #[validate(required, length(min = 1, message = "publicId is required"))]
    pub public_id: Option<String>,

    #[serde(alias = "thumb_url")]
    pub thumb_url: Option<String>,
}

/// `story:new` payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoryNewRequest {
    pub media: Option<MediaInput>,
    pub caption: Option<String>,
}

/// `visibility` payload
#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// `call:*` payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSignalRequest {
    /// Target user id, as a string or a number
    #[serde(deserialize_with = "user_id::deserialize")]
    pub to: i64,
    pub call_id: uuid::Uuid,
    #[serde(default, alias = "type")]
    pub kind: Option<crate::domain::CallKind>,
    /// SDP or ICE candidate, forwarded unmodified
    #[serde(default, alias = "offer", alias = "answer", alias = "candidate")]
    pub payload: Option<serde_json::Value>,
}

/// `identify` payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentifyRequest {
    pub token: Option<String>,
}

/// Story feed query (`GET /api/v1/stories`)
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FeedQuery {
    #[validate(range(min = 1, max = 100, message = "limit must be 1-100"))]
    pub limit: Option<u32>,
}

impl FeedQuery {
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT) as usize
    }
}

/// Accepts user ids sent either as JSON strings or numbers.
mod user_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(id) => Ok(id),
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}
