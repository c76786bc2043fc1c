//! Response DTOs
//!
//! Data structures for WebSocket acknowledgements and API response bodies.

use serde::Serialize;

use crate::application::services::{PresenceStatus, StoryPosted};
use crate::domain::Story;

/// Acknowledgement of a `story:new` event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StoryAck {
    Success {
        story: Story,
        recipients: Vec<String>,
    },
    Error {
        error: &'static str,
    },
}

impl From<StoryPosted> for StoryAck {
    fn from(posted: StoryPosted) -> Self {
        StoryAck::Success {
            story: posted.story,
            recipients: posted.recipients.iter().map(|id| id.to_string()).collect(),
        }
    }
}

/// Acknowledgement of a `ping` event
#[derive(Debug, Clone, Serialize)]
pub struct PingAck {
    pub ok: bool,
    pub ts: i64,
}

/// Active story feed
#[derive(Debug, Serialize)]
pub struct StoryFeedResponse {
    pub stories: Vec<Story>,
}

/// Presence of one user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub user_id: String,
    pub online: bool,
    pub visible: bool,
    pub devices: u64,
}

impl From<PresenceStatus> for PresenceResponse {
    fn from(status: PresenceStatus) -> Self {
        Self {
            user_id: status.user_id.to_string(),
            online: status.online,
            visible: status.visible,
            devices: status.devices,
        }
    }
}
