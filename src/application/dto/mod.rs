//! Data Transfer Objects
//!
//! DTOs for WebSocket payloads and API serialization.

pub mod request;
pub mod response;

pub use request::{
    CallSignalRequest, FeedQuery, IdentifyRequest, MediaInput, StoryNewRequest, VisibilityRequest,
};
pub use response::{PingAck, PresenceResponse, StoryAck, StoryFeedResponse};
