//! Realtime events pushed to clients and the envelope that carries them
//! across server processes.
//!
//! Events serialize to the client wire shape `{"event": <name>, "data": {...}}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::{CallKind, SignalKind, Story};

/// Events delivered to client connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    #[serde(rename = "presence:update")]
    PresenceUpdate(PresenceUpdate),

    #[serde(rename = "story:incoming")]
    StoryIncoming(StoryIncoming),

    #[serde(rename = "call:incoming")]
    CallIncoming(CallSignal),
    #[serde(rename = "call:offer")]
    CallOffer(CallSignal),
    #[serde(rename = "call:answer")]
    CallAnswer(CallSignal),
    #[serde(rename = "call:ice-candidate")]
    CallIceCandidate(CallSignal),
    #[serde(rename = "call:end")]
    CallEnd(CallSignal),
}

impl RealtimeEvent {
    /// Get the event name for logging and metrics
    pub fn event_name(&self) -> &'static str {
        match self {
            RealtimeEvent::PresenceUpdate(_) => "presence:update",
            RealtimeEvent::StoryIncoming(_) => "story:incoming",
            RealtimeEvent::CallIncoming(_) => "call:incoming",
            RealtimeEvent::CallOffer(_) => "call:offer",
            RealtimeEvent::CallAnswer(_) => "call:answer",
            RealtimeEvent::CallIceCandidate(_) => "call:ice-candidate",
            RealtimeEvent::CallEnd(_) => "call:end",
        }
    }

    /// Wrap a relayed signal in the event of the same kind.
    pub fn signal(kind: SignalKind, signal: CallSignal) -> Self {
        match kind {
            SignalKind::Offer => RealtimeEvent::CallOffer(signal),
            SignalKind::Answer => RealtimeEvent::CallAnswer(signal),
            SignalKind::IceCandidate => RealtimeEvent::CallIceCandidate(signal),
            SignalKind::End => RealtimeEvent::CallEnd(signal),
        }
    }

    pub fn presence(user_id: i64, online: bool) -> Self {
        RealtimeEvent::PresenceUpdate(PresenceUpdate {
            user_id: user_id.to_string(),
            online,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub user_id: String,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryIncoming {
    pub story: Story,
}

/// Relayed call signaling payload. `from` is always the verified sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSignal {
    pub from: String,
    pub call_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<CallKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CallSignal {
    pub fn new(from: i64, call_id: Uuid) -> Self {
        Self {
            from: from.to_string(),
            call_id,
            kind: None,
            payload: None,
            reason: None,
        }
    }

    pub fn with_kind(mut self, kind: CallKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_payload(mut self, payload: Option<serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Which connections a delivery is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryTarget {
    /// Specific connection ids, possibly held by different processes
    Connections(Vec<String>),
    /// Every connected client
    All,
}

/// Envelope published on the delivery bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub target: DeliveryTarget,
    pub event: RealtimeEvent,
}

impl Delivery {
    pub fn to_connections(connection_ids: Vec<String>, event: RealtimeEvent) -> Self {
        Self {
            target: DeliveryTarget::Connections(connection_ids),
            event,
        }
    }

    pub fn broadcast(event: RealtimeEvent) -> Self {
        Self {
            target: DeliveryTarget::All,
            event,
        }
    }
}
