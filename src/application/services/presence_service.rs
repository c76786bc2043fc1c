//! Presence Service
//!
//! Derives online/offline transitions from session-set cardinality and fans
//! presence updates out.
//!
//! - Came online (count becomes 1): clear the offline marker and notify the
//!   user's own contacts.
//! - Went offline (count becomes 0): write the offline marker and notify
//!   every connected client.
//! - Additional devices connecting or leaving produce no event.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::session_registry::SessionRegistry;
use crate::domain::{ContactRepository, Delivery, RealtimeEvent};
use crate::infrastructure::cache::{keys, EventBus, SharedStore};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Result of evaluating presence after a registry change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    CameOnline,
    WentOffline,
    Unchanged,
}

/// Presence of one user as seen by the shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceStatus {
    pub user_id: i64,
    pub online: bool,
    pub visible: bool,
    pub devices: u64,
}

/// Presence propagation over the registry, contact graph and delivery bus.
#[derive(Clone)]
pub struct PresenceService {
    registry: SessionRegistry,
    store: Arc<dyn SharedStore>,
    contacts: Arc<dyn ContactRepository>,
    bus: Arc<dyn EventBus>,
    offline_marker_ttl_secs: u64,
}

impl PresenceService {
    pub fn new(
        registry: SessionRegistry,
        store: Arc<dyn SharedStore>,
        contacts: Arc<dyn ContactRepository>,
        bus: Arc<dyn EventBus>,
        offline_marker_ttl_secs: u64,
    ) -> Self {
        Self {
            registry,
            store,
            contacts,
            bus,
            offline_marker_ttl_secs,
        }
    }

    /// Register a connection and evaluate "came online". Only registry
    /// failures are returned; the contact fan-out is best effort.
    #[instrument(skip(self))]
    pub async fn on_connect(
        &self,
        user_id: i64,
        connection_id: &str,
    ) -> Result<PresenceTransition, AppError> {
        self.registry.register(user_id, connection_id).await?;

        if self.registry.count(user_id).await? == 1 {
            if let Err(e) = self.came_online(user_id).await {
                warn!(error = %e, "Online announcement failed");
            }
            Ok(PresenceTransition::CameOnline)
        } else {
            Ok(PresenceTransition::Unchanged)
        }
    }

    /// Deregister a connection and evaluate "went offline".
    #[instrument(skip(self))]
    pub async fn on_disconnect(&self, connection_id: &str) -> Result<PresenceTransition, AppError> {
        let Some(user_id) = self.registry.deregister(connection_id).await? else {
            return Ok(PresenceTransition::Unchanged);
        };

        if self.registry.count(user_id).await? == 0 {
            self.went_offline(user_id).await?;
            Ok(PresenceTransition::WentOffline)
        } else {
            Ok(PresenceTransition::Unchanged)
        }
    }

    /// Clear the offline marker and notify every connection of the user's
    /// contacts.
    #[instrument(skip(self))]
    pub async fn came_online(&self, user_id: i64) -> Result<(), AppError> {
        self.store.delete(&keys::presence(user_id)).await?;

        let contacts = self.contacts.find_contacts(user_id).await?;
        let connections: Vec<String> = self
            .registry
            .resolve(&contacts)
            .await?
            .into_iter()
            .flat_map(|(_, ids)| ids)
            .collect();

        metrics::record_presence_transition(true);
        info!(contacts = contacts.len(), connections = connections.len(), "User came online");

        if connections.is_empty() {
            return Ok(());
        }
        self.bus
            .publish(&Delivery::to_connections(
                connections,
                RealtimeEvent::presence(user_id, true),
            ))
            .await
    }

    /// Write the offline marker and broadcast to every connected client.
    #[instrument(skip(self))]
    pub async fn went_offline(&self, user_id: i64) -> Result<(), AppError> {
        self.store
            .set_ex(
                &keys::presence(user_id),
                keys::OFFLINE,
                self.offline_marker_ttl_secs,
            )
            .await?;

        metrics::record_presence_transition(false);
        info!("User went offline");

        self.bus
            .publish(&Delivery::broadcast(RealtimeEvent::presence(user_id, false)))
            .await
    }

    /// Current presence of a user.
    pub async fn status(&self, user_id: i64) -> Result<PresenceStatus, AppError> {
        let sessions = self.registry.sessions(user_id).await?;
        let devices = self.registry.count(user_id).await?;
        debug!(user_id = user_id, devices = devices, "Presence lookup");

        Ok(PresenceStatus {
            user_id,
            online: devices > 0,
            visible: sessions.iter().any(|s| s.visible),
            devices,
        })
    }
}
