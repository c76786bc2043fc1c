//! Connection identity resolved at handshake time.

use serde::{Deserialize, Serialize};

/// Why a connection could not be tied to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No credential in the identify frame, query string or header
    MissingCredentials,
    /// Signature, algorithm or structure check failed
    InvalidToken,
    /// Token `exp` is in the past
    TokenExpired,
    /// `sub` is not a user id
    InvalidSubject,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingCredentials => "missing_credentials",
            RejectReason::InvalidToken => "invalid_token",
            RejectReason::TokenExpired => "token_expired",
            RejectReason::InvalidSubject => "invalid_subject",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of identity resolution for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Authenticated(i64),
    Rejected(RejectReason),
}

impl Identity {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::Authenticated(id) => Some(*id),
            Identity::Rejected(_) => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Identity::Authenticated(_) => None,
            Identity::Rejected(reason) => Some(*reason),
        }
    }
}
