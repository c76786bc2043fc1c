//! Cache Module
//!
//! Redis connection management, the shared key-value store and the
//! cross-process delivery bus.
//!
//! This module provides:
//! - Redis connection management with automatic reconnection
//! - A `SharedStore` trait holding every piece of cross-connection state
//! - An `EventBus` trait publishing deliveries to every server process
//! - Predefined key builders for consistent key naming
//!
//! # Architecture
//!
//! ```text
//! +-------------------+        +-------------------+
//! |   Services        |        |   Services        |
//! +-------------------+        +-------------------+
//!          |                            |
//!          v                            v
//! +-------------------+        +-------------------+
//! | SharedStore trait |        |  EventBus trait   |
//! +-------------------+        +-------------------+
//!          |                            |
//!          v                            v
//! +-------------------+        +-------------------+
//! |   RedisStore      |        |  RedisEventBus    | --PUBLISH--> realtime:deliveries
//! +-------------------+        +-------------------+                     |
//!          |                            |                                v
//!          +------ ConnectionManager ---+                       run_delivery_subscriber
//! ```

mod event_bus;
mod shared_store;

pub use event_bus::{run_delivery_subscriber, EventBus, RedisEventBus};
pub use shared_store::{RedisStore, SharedStore};

#[cfg(test)]
pub use event_bus::MockEventBus;
#[cfg(test)]
pub use shared_store::MockSharedStore;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Arguments
/// * `settings` - Redis configuration settings
///
/// # Returns
/// * `Ok(ConnectionManager)` - On successful connection
/// * `Err(redis::RedisError)` - If connection fails
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Shared-store key layout.
///
/// # Example
/// ```rust,ignore
/// use realtime_server::infrastructure::cache::keys;
///
/// let set_key = keys::user_sockets(42); // "user:42:sockets"
/// ```
pub mod keys {
    /// Prefix for per-user connection sets (e.g., "user:user_id:sockets")
    pub const USER: &str = "user:";

    /// Suffix for per-user connection sets
    pub const SOCKETS_SUFFIX: &str = ":sockets";

    /// Prefix for connection metadata hashes (e.g., "socket:connection_id")
    pub const SOCKET: &str = "socket:";

    /// Prefix for offline markers (e.g., "presence:user_id")
    pub const PRESENCE: &str = "presence:";

    /// Prefix for call sessions (e.g., "call:call_id")
    pub const CALL: &str = "call:";

    /// Value stored under the offline marker
    pub const OFFLINE: &str = "offline";

    /// Set of a user's live connection ids
    #[inline]
    pub fn user_sockets(user_id: impl std::fmt::Display) -> String {
        format!("{}{}{}", USER, user_id, SOCKETS_SUFFIX)
    }

    /// Metadata hash of one connection
    #[inline]
    pub fn socket(connection_id: impl std::fmt::Display) -> String {
        format!("{}{}", SOCKET, connection_id)
    }

    /// Offline marker of a user
    #[inline]
    pub fn presence(user_id: impl std::fmt::Display) -> String {
        format!("{}{}", PRESENCE, user_id)
    }

    /// Call session record
    #[inline]
    pub fn call(call_id: impl std::fmt::Display) -> String {
        format!("{}{}", CALL, call_id)
    }
}
