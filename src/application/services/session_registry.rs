//! Session Registry
//!
//! Which connections belong to which user, plus per-connection visibility and
//! last-seen metadata. All state lives in the shared store:
//!
//! - `user:{user_id}:sockets` - set of connection ids
//! - `socket:{connection_id}` - hash `{userId, visible, lastSeen}`

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::domain::{connection_fields, encode_visible, ConnectionSession};
use crate::infrastructure::cache::{keys, SharedStore};
use crate::shared::error::AppError;

/// Multi-device session registry over the shared store.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SharedStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Add a connection to the user's set and (re)write its metadata as
    /// visible with a fresh last-seen time.
    #[instrument(skip(self))]
    pub async fn register(&self, user_id: i64, connection_id: &str) -> Result<(), AppError> {
        self.store
            .set_add(&keys::user_sockets(user_id), connection_id)
            .await?;
        let session = ConnectionSession::new(connection_id, user_id);
        self.store
            .hash_set(&keys::socket(connection_id), session.to_fields())
            .await?;

        debug!("Connection registered");
        Ok(())
    }

    /// Remove a connection. Returns the owning user when the connection was
    /// known; unknown connections are a no-op.
    #[instrument(skip(self))]
    pub async fn deregister(&self, connection_id: &str) -> Result<Option<i64>, AppError> {
        let meta_key = keys::socket(connection_id);
        let session = self.load(connection_id).await?;

        let owner = match session {
            Some(session) => {
                self.store
                    .set_remove(&keys::user_sockets(session.user_id), connection_id)
                    .await?;
                Some(session.user_id)
            }
            None => None,
        };
        self.store.delete(&meta_key).await?;

        debug!(owner = ?owner, "Connection deregistered");
        Ok(owner)
    }

    /// Drop a connection whose registration did not complete. Unlike
    /// `deregister` this does not need the metadata hash to exist.
    #[instrument(skip(self))]
    pub async fn evict(&self, user_id: i64, connection_id: &str) -> Result<(), AppError> {
        self.store
            .set_remove(&keys::user_sockets(user_id), connection_id)
            .await?;
        self.store.delete(&keys::socket(connection_id)).await?;

        debug!("Connection evicted");
        Ok(())
    }

    /// Update the visibility flag and last-seen time. Never touches set
    /// membership. Returns false when the connection has no metadata.
    #[instrument(skip(self))]
    pub async fn set_visible(&self, connection_id: &str, visible: bool) -> Result<bool, AppError> {
        if self.load(connection_id).await?.is_none() {
            return Ok(false);
        }

        let fields = vec![
            (connection_fields::VISIBLE.to_string(), encode_visible(visible)),
            (connection_fields::LAST_SEEN.to_string(), Utc::now().to_rfc3339()),
        ];
        self.store.hash_set(&keys::socket(connection_id), fields).await?;
        Ok(true)
    }

    /// Refresh last-seen. Returns false when the connection has no metadata.
    #[instrument(skip(self), level = "trace")]
    pub async fn touch(&self, connection_id: &str) -> Result<bool, AppError> {
        if self.load(connection_id).await?.is_none() {
            return Ok(false);
        }

        let fields = vec![(
            connection_fields::LAST_SEEN.to_string(),
            Utc::now().to_rfc3339(),
        )];
        self.store.hash_set(&keys::socket(connection_id), fields).await?;
        Ok(true)
    }

    /// Connection ids of a user.
    pub async fn list(&self, user_id: i64) -> Result<Vec<String>, AppError> {
        self.store.set_members(&keys::user_sockets(user_id)).await
    }

    /// Number of live connections of a user.
    pub async fn count(&self, user_id: i64) -> Result<u64, AppError> {
        self.store.set_card(&keys::user_sockets(user_id)).await
    }

    /// Metadata of every connection of a user. Ids whose metadata is gone
    /// are skipped.
    pub async fn sessions(&self, user_id: i64) -> Result<Vec<ConnectionSession>, AppError> {
        let mut sessions = Vec::new();
        for connection_id in self.list(user_id).await? {
            if let Some(session) = self.load(&connection_id).await? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// True if any of the user's connections is visible.
    pub async fn any_visible(&self, user_id: i64) -> Result<bool, AppError> {
        Ok(self.sessions(user_id).await?.iter().any(|s| s.visible))
    }

    /// Connection ids of each user, omitting users with none.
    pub async fn resolve(&self, user_ids: &[i64]) -> Result<Vec<(i64, Vec<String>)>, AppError> {
        let mut resolved = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            let connections = self.list(user_id).await?;
            if !connections.is_empty() {
                resolved.push((user_id, connections));
            }
        }
        Ok(resolved)
    }

    async fn load(&self, connection_id: &str) -> Result<Option<ConnectionSession>, AppError> {
        let hash = self.store.hash_get_all(&keys::socket(connection_id)).await?;
        Ok(ConnectionSession::from_fields(connection_id, &hash))
    }
}
