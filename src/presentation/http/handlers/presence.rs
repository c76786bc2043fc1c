//! Presence Handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::application::dto::PresenceResponse;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Get a user's presence
///
/// GET /api/v1/presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<PresenceResponse>, AppError> {
    let status = state.realtime.presence.status(user_id).await?;
    Ok(Json(status.into()))
}
