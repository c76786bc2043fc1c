//! # Domain Entities
//!
//! Core domain entities of the realtime server.
//!
//! ## Shared-store entities (never durable)
//!
//! - **ConnectionSession**: one live transport connection (owner, visibility, last seen)
//! - **CallSession**: one call attempt and its signaling state
//!
//! ## Durable entities
//!
//! - **ContactEdge**: directed "A added B" relation, read-only here
//! - **Story**: ephemeral media post with an expiry
//!
//! ## Repository Traits
//!
//! Durable entities have a repository trait implemented in the
//! infrastructure layer.

mod call;
mod connection;
mod contact;
mod story;

pub use call::{CallKind, CallSession, CallState, CallTransitionError, SignalKind};
pub use connection::{encode_visible, fields as connection_fields, ConnectionSession};
pub use contact::{is_mutual, ContactEdge, ContactRepository};
pub use story::{MediaDescriptor, NewStory, ResourceType, Story, StoryRepository};

#[cfg(test)]
pub use contact::MockContactRepository;
#[cfg(test)]
pub use story::MockStoryRepository;
