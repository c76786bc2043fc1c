//! Contact edge entity and repository trait.
//!
//! Maps to the `contacts` table owned by the profile service:
//! - owner_id: BIGINT NOT NULL (the user who added the contact)
//! - contact_user_id: BIGINT NOT NULL
//! - is_blocked: BOOLEAN NOT NULL DEFAULT FALSE
//!
//! Edges are directed. Two users are mutual contacts when both edges exist
//! and neither is blocked.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Directed "owner added contact" relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEdge {
    pub owner_id: i64,
    pub contact_user_id: i64,
    pub is_blocked: bool,
}

impl ContactEdge {
    pub fn new(owner_id: i64, contact_user_id: i64) -> Self {
        Self {
            owner_id,
            contact_user_id,
            is_blocked: false,
        }
    }

    pub fn blocked(mut self) -> Self {
        self.is_blocked = true;
        self
    }
}

/// Mutuality predicate over an edge set: both directions present and unblocked.
pub fn is_mutual(edges: &[ContactEdge], a: i64, b: i64) -> bool {
    let open = |from: i64, to: i64| {
        edges
            .iter()
            .any(|e| e.owner_id == from && e.contact_user_id == to && !e.is_blocked)
    };
    open(a, b) && open(b, a)
}

/// Read-only access to the contact graph.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Users the owner has added (every outgoing edge).
    async fn find_contacts(&self, owner_id: i64) -> Result<Vec<i64>, AppError>;

    /// Owners whose unblocked edge points at `user_id`.
    async fn find_reverse_contacts(&self, user_id: i64) -> Result<Vec<i64>, AppError>;

    /// Targets of `user_id`'s unblocked edges restricted to `among`.
    async fn find_mutual_contacts(&self, user_id: i64, among: &[i64])
        -> Result<Vec<i64>, AppError>;
}
