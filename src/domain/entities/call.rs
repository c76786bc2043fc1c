//! Call Session entity.
//!
//! One call attempt between two users, identified by a client-chosen UUID and
//! stored in the shared store under `call:{call_id}`. Signaling messages are
//! validated against a small state machine:
//!
//! ```text
//! Ringing --answer--> Connected --end--> Ended
//!    |  \--end--> Ended
//!    \--ring timeout--> Timeout
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Ringing,
    Connected,
    Ended,
    Timeout,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended | CallState::Timeout)
    }
}

/// Media requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    #[default]
    Audio,
    Video,
}

/// Signaling message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
    End,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
            SignalKind::End => "end",
        }
    }
}

/// Why a signal was not accepted by a call session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallTransitionError {
    #[error("user {0} is not a participant")]
    NotParticipant(i64),

    #[error("signal must be addressed to the other participant")]
    WrongTarget,

    #[error("only the callee may answer")]
    NotCallee,

    #[error("{signal} not allowed while {state:?}")]
    InvalidState { signal: &'static str, state: CallState },

    #[error("call already exists")]
    AlreadyStarted,
}

/// Stored call session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: Uuid,
    pub caller_id: i64,
    pub callee_id: i64,
    pub kind: CallKind,
    pub state: CallState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallSession {
    /// A new ringing call.
    pub fn ringing(call_id: Uuid, caller_id: i64, callee_id: i64, kind: CallKind) -> Self {
        let now = Utc::now();
        Self {
            call_id,
            caller_id,
            callee_id,
            kind,
            state: CallState::Ringing,
            created_at: now,
            updated_at: now,
        }
    }

    /// The other participant, if `user_id` takes part in the call.
    pub fn peer_of(&self, user_id: i64) -> Option<i64> {
        if user_id == self.caller_id {
            Some(self.callee_id)
        } else if user_id == self.callee_id {
            Some(self.caller_id)
        } else {
            None
        }
    }

    /// Apply a signal sent by `sender` to `target`, returning the new state.
    pub fn apply(
        &mut self,
        sender: i64,
        target: i64,
        signal: SignalKind,
    ) -> Result<CallState, CallTransitionError> {
        let peer = self
            .peer_of(sender)
            .ok_or(CallTransitionError::NotParticipant(sender))?;
        if peer != target {
            return Err(CallTransitionError::WrongTarget);
        }

        let next = match (signal, self.state) {
            (SignalKind::Offer, _) => return Err(CallTransitionError::AlreadyStarted),
            (SignalKind::Answer, CallState::Ringing) => {
                if sender != self.callee_id {
                    return Err(CallTransitionError::NotCallee);
                }
                CallState::Connected
            }
            (SignalKind::IceCandidate, state @ (CallState::Ringing | CallState::Connected)) => state,
            (SignalKind::End, CallState::Ringing | CallState::Connected) => CallState::Ended,
            (signal, state) => {
                return Err(CallTransitionError::InvalidState {
                    signal: signal.as_str(),
                    state,
                })
            }
        };

        if next != self.state {
            self.state = next;
            self.updated_at = Utc::now();
        }
        Ok(next)
    }

    /// Ring timeout elapsed. Only a still-ringing call times out.
    pub fn expire(&mut self) -> bool {
        if self.state == CallState::Ringing {
            self.state = CallState::Timeout;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }
}
