//! Story Handlers
//!
//! Active story feed and view receipts for the bearer-token user.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::application::dto::{FeedQuery, StoryFeedResponse};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Get the active story feed
///
/// GET /api/v1/stories
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<StoryFeedResponse>, AppError> {
    validate(&query)?;

    let stories = state
        .realtime
        .stories
        .active_feed(auth.user_id, query.limit())
        .await?;

    Ok(Json(StoryFeedResponse { stories }))
}

/// Record a story view
///
/// POST /api/v1/stories/{story_id}/views
pub async fn record_view(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(story_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state
        .realtime
        .stories
        .record_view(auth.user_id, story_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
