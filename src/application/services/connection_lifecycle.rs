//! Connection Lifecycle
//!
//! Binds a transport connection to an identity, dispatches its inbound
//! events to the realtime services and cleans up on close.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::identity_service::HandshakeCredentials;
use super::realtime::RealtimeServices;
use crate::application::dto::{
    CallSignalRequest, PingAck, StoryAck, StoryNewRequest, VisibilityRequest,
};
use crate::domain::{Identity, SignalKind};
use crate::shared::error::AppError;

/// Inbound client event, decoded from its name and data.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Identify,
    Visibility(VisibilityRequest),
    StoryNew(StoryNewRequest),
    Ping,
    Signal(SignalKind, CallSignalRequest),
    /// Known event whose data could not be decoded
    Malformed { event: String, error: String },
    Unknown(String),
}

impl InboundEvent {
    pub fn parse(event: &str, data: Value) -> Self {
        let signal = match event {
            "identify" => return InboundEvent::Identify,
            "ping" => return InboundEvent::Ping,
            // A story without decodable data is validated as empty
            "story:new" => {
                return InboundEvent::StoryNew(serde_json::from_value(data).unwrap_or_default())
            }
            "visibility" => {
                return match serde_json::from_value(data) {
                    Ok(request) => InboundEvent::Visibility(request),
                    Err(e) => InboundEvent::malformed(event, e),
                }
            }
            "call:offer" => SignalKind::Offer,
            "call:answer" => SignalKind::Answer,
            "call:ice-candidate" => SignalKind::IceCandidate,
            "call:end" => SignalKind::End,
            other => return InboundEvent::Unknown(other.to_string()),
        };

        match serde_json::from_value(data) {
            Ok(request) => InboundEvent::Signal(signal, request),
            Err(e) => InboundEvent::malformed(event, e),
        }
    }

    fn malformed(event: &str, error: serde_json::Error) -> Self {
        InboundEvent::Malformed {
            event: event.to_string(),
            error: error.to_string(),
        }
    }
}

/// Identity bound to one live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    pub connection_id: String,
    pub identity: Identity,
}

impl ConnectionContext {
    pub fn user_id(&self) -> Option<i64> {
        self.identity.user_id()
    }
}

/// Per-connection controller over the realtime services.
#[derive(Clone)]
pub struct ConnectionLifecycle {
    services: RealtimeServices,
}

impl ConnectionLifecycle {
    pub fn new(services: RealtimeServices) -> Self {
        Self { services }
    }

    /// Resolve the connection's identity. Authenticated connections are
    /// registered and evaluated for "came online"; rejected ones are not.
    /// A registration that fails is rolled back before the error returns.
    #[instrument(skip(self, credentials))]
    pub async fn connect(
        &self,
        connection_id: &str,
        credentials: &HandshakeCredentials,
    ) -> Result<ConnectionContext, AppError> {
        let identity = self.services.verifier.resolve(credentials);

        match identity {
            Identity::Authenticated(user_id) => {
                if let Err(e) = self.services.presence.on_connect(user_id, connection_id).await {
                    // Leave nothing behind that would keep the user online
                    if let Err(cleanup) = self.services.registry.evict(user_id, connection_id).await
                    {
                        warn!(error = %cleanup, "Failed to evict half-registered connection");
                    }
                    return Err(e);
                }
            }
            Identity::Rejected(reason) => {
                debug!(reason = %reason, "Connection not authenticated");
            }
        }

        Ok(ConnectionContext {
            connection_id: connection_id.to_string(),
            identity,
        })
    }

    /// Handle one inbound event and return the acknowledgement payload, if
    /// the event has one. Rejected connections only get answers to `ping`
    /// and `story:new`.
    #[instrument(skip(self, ctx, event), fields(connection_id = %ctx.connection_id, user_id = ?ctx.user_id()))]
    pub async fn handle(&self, ctx: &ConnectionContext, event: InboundEvent) -> Option<Value> {
        match event {
            InboundEvent::Ping => {
                if ctx.identity.is_authenticated() {
                    if let Err(e) = self.services.registry.touch(&ctx.connection_id).await {
                        warn!(error = %e, "Failed to refresh last-seen");
                    }
                }
                to_ack(&PingAck {
                    ok: true,
                    ts: Utc::now().timestamp_millis(),
                })
            }
            InboundEvent::StoryNew(request) => {
                let ack = match self.services.stories.post(ctx.user_id(), request).await {
                    Ok(posted) => StoryAck::from(posted),
                    Err(e) => StoryAck::Error { error: e.code() },
                };
                to_ack(&ack)
            }
            InboundEvent::Visibility(request) => {
                if ctx.identity.is_authenticated() {
                    match self
                        .services
                        .registry
                        .set_visible(&ctx.connection_id, request.visible)
                        .await
                    {
                        Ok(true) => debug!(visible = request.visible, "Visibility updated"),
                        Ok(false) => debug!("Visibility for unregistered connection ignored"),
                        Err(e) => warn!(error = %e, "Failed to update visibility"),
                    }
                }
                None
            }
            InboundEvent::Signal(kind, request) => {
                if let Some(user_id) = ctx.user_id() {
                    if let Err(e) = self.services.signaling.relay(user_id, kind, request).await {
                        warn!(error = %e, "Signal relay failed");
                    }
                }
                None
            }
            InboundEvent::Identify => {
                debug!("Identify after handshake ignored");
                None
            }
            InboundEvent::Malformed { event, error } => {
                debug!(event = %event, error = %error, "Malformed event data");
                None
            }
            InboundEvent::Unknown(event) => {
                debug!(event = %event, "Unknown event");
                None
            }
        }
    }

    /// Deregister the connection and evaluate "went offline".
    #[instrument(skip(self, ctx), fields(connection_id = %ctx.connection_id))]
    pub async fn disconnect(&self, ctx: &ConnectionContext) {
        if !ctx.identity.is_authenticated() {
            return;
        }
        if let Err(e) = self.services.presence.on_disconnect(&ctx.connection_id).await {
            warn!(error = %e, "Failed to clean up connection");
        }
    }
}

fn to_ack<T: serde::Serialize>(ack: &T) -> Option<Value> {
    match serde_json::to_value(ack) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Failed to encode acknowledgement");
            None
        }
    }
}
