//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **SessionRegistry**: Which connections belong to which user
//! - **PresenceService**: Online/offline transitions and their fan-out
//! - **StoryService**: Story validation, persistence and mutual-contact fan-out
//! - **SignalingService**: Call signaling relay with per-call state
//! - **TokenVerifier**: Handshake identity resolution
//! - **ConnectionLifecycle**: Per-connection event dispatch

pub mod connection_lifecycle;
pub mod identity_service;
pub mod presence_service;
pub mod realtime;
pub mod session_registry;
pub mod signaling_service;
pub mod story_service;

pub use connection_lifecycle::{ConnectionContext, ConnectionLifecycle, InboundEvent};
pub use identity_service::{Claims, HandshakeCredentials, TokenVerifier};
pub use presence_service::{PresenceService, PresenceStatus, PresenceTransition};
pub use realtime::RealtimeServices;
pub use session_registry::SessionRegistry;
pub use signaling_service::{DropReason, SignalOutcome, SignalingService};
pub use story_service::{StoryError, StoryPosted, StoryService};
