//! Story Repository Implementation
//!
//! PostgreSQL implementation of the StoryRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{MediaDescriptor, NewStory, ResourceType, Story, StoryRepository};
use crate::shared::error::AppError;

/// Database row representation matching the stories table schema.
#[derive(Debug, sqlx::FromRow)]
struct StoryRow {
    id: i64,
    owner_id: i64,
    public_id: String,
    url: String,
    thumb_url: Option<String>,
    resource_type: String,
    caption: String,
    viewers: Vec<i64>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl StoryRow {
    /// Convert database row to domain Story entity.
    fn into_story(self) -> Result<Story, AppError> {
        let resource_type = ResourceType::parse(&self.resource_type).ok_or_else(|| {
            AppError::Internal(format!(
                "story {} has unknown resource type {}",
                self.id, self.resource_type
            ))
        })?;

        Ok(Story {
            id: self.id,
            owner_id: self.owner_id,
            media: MediaDescriptor {
                url: self.url,
                thumb_url: self.thumb_url,
                resource_type,
                public_id: self.public_id,
            },
            caption: self.caption,
            viewers: self.viewers,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

/// PostgreSQL story repository implementation.
#[derive(Clone)]
pub struct PgStoryRepository {
    pool: PgPool,
}

impl PgStoryRepository {
    /// Create a new PgStoryRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn create(&self, story: &NewStory) -> Result<Story, AppError> {
        let row = sqlx::query_as::<_, StoryRow>(
            r#"
            INSERT INTO stories (
                id, owner_id, public_id, url, thumb_url, resource_type,
                caption, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, owner_id, public_id, url, thumb_url, resource_type,
                      caption, viewers, created_at, expires_at
            "#,
        )
        .bind(story.id)
        .bind(story.owner_id)
        .bind(&story.media.public_id)
        .bind(&story.media.url)
        .bind(&story.media.thumb_url)
        .bind(story.media.resource_type.as_str())
        .bind(&story.caption)
        .bind(story.created_at)
        .bind(story.expires_at)
        .fetch_one(&self.pool)
        .await?;

        row.into_story()
    }

    async fn find_active_by_owners(
        &self,
        owner_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<Story>, AppError> {
        if owner_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, StoryRow>(
            r#"
            SELECT id, owner_id, public_id, url, thumb_url, resource_type,
                   caption, viewers, created_at, expires_at
            FROM stories
            WHERE owner_id = ANY($1) AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_ids)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoryRow::into_story).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Story>, AppError> {
        let row = sqlx::query_as::<_, StoryRow>(
            r#"
            SELECT id, owner_id, public_id, url, thumb_url, resource_type,
                   caption, viewers, created_at, expires_at
            FROM stories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoryRow::into_story).transpose()
    }

    /// Appends the viewer unless already present.
    async fn add_viewer(&self, id: i64, viewer_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE stories
            SET viewers = CASE
                WHEN $2 = ANY(viewers) THEN viewers
                ELSE array_append(viewers, $2)
            END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(viewer_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
