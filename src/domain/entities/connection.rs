//! Connection Session entity.
//!
//! One live transport connection as recorded in the shared store under
//! `socket:{connection_id}`:
//! - userId: owning user
//! - visible: "1" | "0"
//! - lastSeen: RFC 3339 timestamp

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hash field names used in the shared store.
pub mod fields {
    pub const USER_ID: &str = "userId";
    pub const VISIBLE: &str = "visible";
    pub const LAST_SEEN: &str = "lastSeen";
}

/// Registry entry for one live connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSession {
    pub connection_id: String,
    pub user_id: i64,
    pub visible: bool,
    pub last_seen_at: DateTime<Utc>,
}

impl ConnectionSession {
    /// Fresh, visible session.
    pub fn new(connection_id: impl Into<String>, user_id: i64) -> Self {
        Self {
            connection_id: connection_id.into(),
            user_id,
            visible: true,
            last_seen_at: Utc::now(),
        }
    }

    /// Encode as the flat hash stored in the shared store.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            (fields::USER_ID.to_string(), self.user_id.to_string()),
            (fields::VISIBLE.to_string(), encode_visible(self.visible)),
            (fields::LAST_SEEN.to_string(), self.last_seen_at.to_rfc3339()),
        ]
    }

    /// Decode from a stored hash. Returns `None` when the owner is missing or
    /// malformed, which callers treat as "no such connection".
    pub fn from_fields(connection_id: &str, hash: &HashMap<String, String>) -> Option<Self> {
        let user_id = hash.get(fields::USER_ID)?.parse::<i64>().ok()?;
        let visible = hash
            .get(fields::VISIBLE)
            .map(|v| v == "1")
            .unwrap_or(false);
        let last_seen_at = hash
            .get(fields::LAST_SEEN)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Some(Self {
            connection_id: connection_id.to_string(),
            user_id,
            visible,
            last_seen_at,
        })
    }
}

pub fn encode_visible(visible: bool) -> String {
    if visible { "1" } else { "0" }.to_string()
}
