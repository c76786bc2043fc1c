//! Identity Service
//!
//! Resolves the user behind a connection from handshake credentials.
//! Credentials are HS256 JWTs whose `sub` claim is the user id.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JwtSettings;
use crate::domain::{Identity, RejectReason};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Credentials offered during the handshake, one slot per source.
#[derive(Debug, Clone, Default)]
pub struct HandshakeCredentials {
    /// `token` of the client's identify frame
    pub auth_token: Option<String>,
    /// `?token=` on the upgrade request
    pub query_token: Option<String>,
    /// `Authorization: Bearer` on the upgrade request
    pub header_token: Option<String>,
}

impl HandshakeCredentials {
    /// First non-empty credential in priority order: identify frame, query
    /// parameter, header.
    pub fn credential(&self) -> Option<&str> {
        [&self.auth_token, &self.query_token, &self.header_token]
            .into_iter()
            .filter_map(|slot| slot.as_deref())
            .map(str::trim)
            .find(|token| !token.is_empty())
    }

    /// True when the upgrade request itself carried a token.
    pub fn has_upgrade_credential(&self) -> bool {
        [&self.query_token, &self.header_token]
            .into_iter()
            .filter_map(|slot| slot.as_deref())
            .any(|token| !token.trim().is_empty())
    }
}

/// Verifies connection tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Decode a token and return the user id in its subject.
    pub fn verify(&self, token: &str) -> Result<i64, RejectReason> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "Token rejected");
            match e.kind() {
                ErrorKind::ExpiredSignature => RejectReason::TokenExpired,
                _ => RejectReason::InvalidToken,
            }
        })?;

        data.claims
            .sub
            .parse::<i64>()
            .map_err(|_| RejectReason::InvalidSubject)
    }

    /// Resolve a connection identity from handshake credentials.
    pub fn resolve(&self, credentials: &HandshakeCredentials) -> Identity {
        match credentials.credential() {
            None => Identity::Rejected(RejectReason::MissingCredentials),
            Some(token) => match self.verify(token) {
                Ok(user_id) => Identity::Authenticated(user_id),
                Err(reason) => Identity::Rejected(reason),
            },
        }
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}
