//! Signaling Service
//!
//! Relays call negotiation messages between two users. Every message names a
//! call id; the call session in the shared store decides whether the message
//! is accepted. Delivery is best effort: a target without live connections
//! simply misses the message.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::session_registry::SessionRegistry;
use crate::application::dto::CallSignalRequest;
use crate::config::CallSettings;
use crate::domain::{
    CallSession, CallSignal, CallTransitionError, Delivery, RealtimeEvent, SignalKind,
};
use crate::infrastructure::cache::{keys, EventBus, SharedStore};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Why a signaling message was not relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    SelfCall,
    /// Offer to a user with no live connection: no call is recorded
    CalleeOffline,
    /// Offer reusing an existing call id
    CallExists,
    UnknownCall,
    Rejected(CallTransitionError),
    /// Accepted by the call session but the peer has no live connection
    PeerOffline,
    /// The call session changed between reading and writing it
    Superseded,
}

/// Outcome of relaying one signaling message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Relayed { connections: usize },
    Dropped(DropReason),
}

/// Call signaling relay.
#[derive(Clone)]
pub struct SignalingService {
    registry: SessionRegistry,
    store: Arc<dyn SharedStore>,
    bus: Arc<dyn EventBus>,
    ring_timeout: Duration,
    session_ttl_secs: u64,
}

impl SignalingService {
    pub fn new(
        registry: SessionRegistry,
        store: Arc<dyn SharedStore>,
        bus: Arc<dyn EventBus>,
        settings: &CallSettings,
    ) -> Self {
        Self {
            registry,
            store,
            bus,
            ring_timeout: Duration::from_secs(settings.ring_timeout_secs),
            session_ttl_secs: settings.session_ttl_secs,
        }
    }

    /// Relay a signal from the verified sender `from`.
    #[instrument(skip(self, kind, request), fields(kind = kind.as_str(), to = request.to, call_id = %request.call_id))]
    pub async fn relay(
        &self,
        from: i64,
        kind: SignalKind,
        request: CallSignalRequest,
    ) -> Result<SignalOutcome, AppError> {
        let outcome = match kind {
            SignalKind::Offer => self.offer(from, request).await?,
            _ => self.forward(from, kind, request).await?,
        };

        match &outcome {
            SignalOutcome::Relayed { connections } => {
                metrics::record_signal(kind.as_str(), true);
                debug!(connections = connections, "Signal relayed");
            }
            SignalOutcome::Dropped(reason) => {
                metrics::record_signal(kind.as_str(), false);
                debug!(reason = ?reason, "Signal dropped");
            }
        }
        Ok(outcome)
    }

    async fn offer(&self, from: i64, request: CallSignalRequest) -> Result<SignalOutcome, AppError> {
        if request.to == from {
            return Ok(SignalOutcome::Dropped(DropReason::SelfCall));
        }

        let targets = self.registry.list(request.to).await?;
        if targets.is_empty() {
            return Ok(SignalOutcome::Dropped(DropReason::CalleeOffline));
        }

        let session = CallSession::ringing(
            request.call_id,
            from,
            request.to,
            request.kind.unwrap_or_default(),
        );
        let encoded = serde_json::to_string(&session)?;
        let created = self
            .store
            .set_nx_ex(&keys::call(session.call_id), &encoded, self.session_ttl_secs)
            .await?;
        if !created {
            return Ok(SignalOutcome::Dropped(DropReason::CallExists));
        }

        let base = CallSignal::new(from, session.call_id).with_kind(session.kind);
        let connections = targets.len();
        self.bus
            .publish(&Delivery::to_connections(
                targets.clone(),
                RealtimeEvent::CallIncoming(base.clone()),
            ))
            .await?;
        self.bus
            .publish(&Delivery::to_connections(
                targets,
                RealtimeEvent::CallOffer(base.with_payload(request.payload)),
            ))
            .await?;

        info!(caller = from, callee = session.callee_id, "Call ringing");
        self.spawn_ring_timeout(session.call_id);

        Ok(SignalOutcome::Relayed { connections })
    }

    async fn forward(
        &self,
        from: i64,
        kind: SignalKind,
        request: CallSignalRequest,
    ) -> Result<SignalOutcome, AppError> {
        let Some((stored, mut session)) = self.load_stored(request.call_id).await? else {
            return Ok(SignalOutcome::Dropped(DropReason::UnknownCall));
        };

        let previous = session.state;
        let state = match session.apply(from, request.to, kind) {
            Ok(state) => state,
            Err(e) => return Ok(SignalOutcome::Dropped(DropReason::Rejected(e))),
        };
        if state != previous {
            if !self.save(&stored, &session).await? {
                return Ok(SignalOutcome::Dropped(DropReason::Superseded));
            }
            info!(state = ?state, "Call state changed");
        }

        let targets = self.registry.list(request.to).await?;
        if targets.is_empty() {
            return Ok(SignalOutcome::Dropped(DropReason::PeerOffline));
        }

        let connections = targets.len();
        let signal = CallSignal::new(from, session.call_id).with_payload(request.payload);
        self.bus
            .publish(&Delivery::to_connections(
                targets,
                RealtimeEvent::signal(kind, signal),
            ))
            .await?;

        Ok(SignalOutcome::Relayed { connections })
    }

    /// Time out a call that is still ringing and tell both participants.
    /// Returns false when the call is gone or already answered or ended.
    #[instrument(skip(self))]
    pub async fn expire(&self, call_id: Uuid) -> Result<bool, AppError> {
        let Some((stored, mut session)) = self.load_stored(call_id).await? else {
            return Ok(false);
        };
        if !session.expire() {
            return Ok(false);
        }
        // An answer or hang-up that landed after the read wins
        if !self.save(&stored, &session).await? {
            debug!("Call changed before timeout, keeping it");
            return Ok(false);
        }
        info!(caller = session.caller_id, callee = session.callee_id, "Call timed out");

        for (recipient, peer) in [
            (session.callee_id, session.caller_id),
            (session.caller_id, session.callee_id),
        ] {
            let targets = self.registry.list(recipient).await?;
            if targets.is_empty() {
                continue;
            }
            let signal = CallSignal::new(peer, call_id).with_reason("timeout");
            self.bus
                .publish(&Delivery::to_connections(
                    targets,
                    RealtimeEvent::CallEnd(signal),
                ))
                .await?;
        }
        Ok(true)
    }

    /// Current state of a call session, if it is still stored.
    pub async fn load(&self, call_id: Uuid) -> Result<Option<CallSession>, AppError> {
        Ok(self.load_stored(call_id).await?.map(|(_, session)| session))
    }

    async fn load_stored(&self, call_id: Uuid) -> Result<Option<(String, CallSession)>, AppError> {
        match self.store.get(&keys::call(call_id)).await? {
            Some(raw) => {
                let session = serde_json::from_str(&raw)?;
                Ok(Some((raw, session)))
            }
            None => Ok(None),
        }
    }

    /// Write `session` only if the stored record is still `stored`.
    async fn save(&self, stored: &str, session: &CallSession) -> Result<bool, AppError> {
        let encoded = serde_json::to_string(session)?;
        self.store
            .compare_and_set_ex(
                &keys::call(session.call_id),
                stored,
                &encoded,
                self.session_ttl_secs,
            )
            .await
    }

    fn spawn_ring_timeout(&self, call_id: Uuid) {
        let relay = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(relay.ring_timeout).await;
            if let Err(e) = relay.expire(call_id).await {
                warn!(call_id = %call_id, error = %e, "Ring timeout failed");
            }
        });
    }
}
