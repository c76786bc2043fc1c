//! WebSocket Message Types
//!
//! Event-named JSON frames: `{"event", "data", "ack"?}` from clients,
//! `{"event", "data"}` pushes and `{"ack", "data"}` acknowledgements from the
//! server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{RealtimeEvent, RejectReason};

/// Incoming client frame
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    /// Acknowledgement id to echo back, if the client wants one
    #[serde(default)]
    pub ack: Option<u64>,
}

/// Server frames that are not realtime events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ControlFrame {
    Hello(HelloPayload),
    Ready(ReadyPayload),
}

/// Outgoing server frame
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Push(RealtimeEvent),
    Control(ControlFrame),
    Ack { ack: u64, data: Value },
}

/// `hello` payload, sent on open
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
    pub connection_id: String,
}

/// `ready` payload, sent once identity is resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub connection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl ServerFrame {
    pub fn hello(connection_id: &str, heartbeat_interval: u64) -> Self {
        ServerFrame::Control(ControlFrame::Hello(HelloPayload {
            heartbeat_interval,
            connection_id: connection_id.to_string(),
        }))
    }

    pub fn ready(connection_id: &str, user_id: Option<i64>, reason: Option<RejectReason>) -> Self {
        ServerFrame::Control(ControlFrame::Ready(ReadyPayload {
            connection_id: connection_id.to_string(),
            user_id: user_id.map(|id| id.to_string()),
            authenticated: user_id.is_some(),
            reason,
        }))
    }
}
