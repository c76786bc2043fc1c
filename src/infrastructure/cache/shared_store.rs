//! Shared Store
//!
//! The key-value store holding all cross-connection state: session sets,
//! connection metadata, offline markers and call sessions.
//!
//! Every server process talks to the same store, so nothing here is cached
//! in process memory.
//!
//! # Example
//!
//! ```rust,ignore
//! use realtime_server::infrastructure::cache::{keys, RedisStore, SharedStore};
//!
//! let store = RedisStore::new(redis_connection);
//!
//! store.set_add(&keys::user_sockets(42), "c1").await?;
//! let count = store.set_card(&keys::user_sockets(42)).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, instrument};

use crate::shared::error::AppError;

/// Shared key-value store operations.
///
/// All operations are async and return `Result<T, AppError>`; store I/O
/// failures surface as `AppError::Redis`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Adds a member to a set.
    ///
    /// # Returns
    /// * `Ok(true)` - If the member was newly added
    /// * `Ok(false)` - If the member was already present
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, AppError>;

    /// Removes a member from a set.
    ///
    /// # Returns
    /// * `Ok(true)` - If the member was present and removed
    /// * `Ok(false)` - If the member was not present
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, AppError>;

    /// Number of members in a set (0 for a missing key).
    async fn set_card(&self, key: &str) -> Result<u64, AppError>;

    /// All members of a set (empty for a missing key).
    async fn set_members(&self, key: &str) -> Result<Vec<String>, AppError>;

    /// Writes the given fields of a hash, creating it if needed.
    async fn hash_set(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), AppError>;

    /// All fields of a hash (empty for a missing key).
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, AppError>;

    /// Stores a string value with a time-to-live in seconds.
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), AppError>;

    /// Stores a value with expiry only if the key does not already exist.
    ///
    /// # Returns
    /// * `Ok(true)` - If the key was set (did not exist)
    /// * `Ok(false)` - If the key already exists
    async fn set_nx_ex(&self, key: &str, value: &str, seconds: u64) -> Result<bool, AppError>;

    /// Replaces a value, keeping the expiry fresh, only while it still
    /// equals `expected`.
    ///
    /// # Returns
    /// * `Ok(true)` - If the value matched and was replaced
    /// * `Ok(false)` - If the key is missing or holds another value
    async fn compare_and_set_ex(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        seconds: u64,
    ) -> Result<bool, AppError>;

    /// Reads a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Deletes a key.
    ///
    /// # Returns
    /// * `Ok(true)` - If the key existed and was deleted
    /// * `Ok(false)` - If the key did not exist
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Round-trips to the store (readiness checks).
    async fn ping(&self) -> Result<(), AppError>;
}

/// GET and SET EX run as one script so no writer can slip in between.
static COMPARE_AND_SET: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
        if redis.call('GET', KEYS[1]) == ARGV[1] then
            redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
            return 1
        end
        return 0
        ",
    )
});

/// Redis-backed shared store.
///
/// Uses a Redis ConnectionManager for connection multiplexing and
/// automatic reconnection handling.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    #[instrument(skip(self), level = "debug")]
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();

        let added: i64 = conn.sadd(key, member).await?;
        debug!(key = %key, added = added, "Set add");

        Ok(added > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();

        let removed: i64 = conn.srem(key, member).await?;
        debug!(key = %key, removed = removed, "Set remove");

        Ok(removed > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_card(&self, key: &str) -> Result<u64, AppError> {
        let mut conn = self.conn.clone();

        let count: u64 = conn.scard(key).await?;
        Ok(count)
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_members(&self, key: &str) -> Result<Vec<String>, AppError> {
        let mut conn = self.conn.clone();

        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    #[instrument(skip(self, fields), level = "debug")]
    async fn hash_set(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), AppError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();

        let _: () = conn.hset_multiple(key, fields.as_slice()).await?;
        debug!(key = %key, fields = fields.len(), "Hash set");

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, AppError> {
        let mut conn = self.conn.clone();

        let hash: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(hash)
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();

        let _: () = conn.set_ex(key, value, seconds).await?;
        debug!(key = %key, ttl = seconds, "Set with expiry");

        Ok(())
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_nx_ex(&self, key: &str, value: &str, seconds: u64) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();

        // SET with NX and EX options for atomic set-if-not-exists with expiry
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await?;

        let was_set = result.is_some();
        debug!(key = %key, ttl = seconds, was_set = was_set, "Set NX with expiry");

        Ok(was_set)
    }

    #[instrument(skip(self, expected, value), level = "debug")]
    async fn compare_and_set_ex(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        seconds: u64,
    ) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();

        let replaced: i64 = COMPARE_AND_SET
            .key(key)
            .arg(expected)
            .arg(value)
            .arg(seconds)
            .invoke_async(&mut conn)
            .await?;
        debug!(key = %key, replaced = replaced == 1, "Compare and set");

        Ok(replaced == 1)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();

        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();

        let deleted: u64 = conn.del(key).await?;
        debug!(key = %key, deleted = deleted > 0, "Delete");

        Ok(deleted > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.conn.clone();

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}
