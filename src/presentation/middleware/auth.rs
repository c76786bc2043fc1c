//! Authentication Middleware
//!
//! Bearer-token validation for the HTTP API. Tokens are the same HS256 JWTs
//! the WebSocket handshake accepts.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::domain::RejectReason;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    // Check for Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))?;

    let user_id = state
        .realtime
        .verifier
        .verify(token)
        .map_err(rejection)?;

    // Insert authenticated user into request extensions
    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

fn rejection(reason: RejectReason) -> AppError {
    let message = match reason {
        RejectReason::TokenExpired => "Token expired",
        RejectReason::InvalidSubject => "Invalid token claims",
        _ => "Invalid token",
    };
    AppError::Unauthorized(message.into())
}
