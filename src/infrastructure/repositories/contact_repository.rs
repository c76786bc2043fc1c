//! Contact Repository Implementation
//!
//! PostgreSQL implementation of the ContactRepository trait.
//! Read-only: the contact graph is maintained by the profile service.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::ContactRepository;
use crate::shared::error::AppError;

/// PostgreSQL contact repository implementation.
#[derive(Clone)]
pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    /// Create a new PgContactRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    /// Every user the owner has added, blocked or not.
    async fn find_contacts(&self, owner_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT contact_user_id
            FROM contacts
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Owners who added `user_id` and have not blocked them.
    async fn find_reverse_contacts(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT owner_id
            FROM contacts
            WHERE contact_user_id = $1 AND is_blocked = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Unblocked contacts of `user_id` restricted to `among`.
    async fn find_mutual_contacts(
        &self,
        user_id: i64,
        among: &[i64],
    ) -> Result<Vec<i64>, AppError> {
        if among.is_empty() {
            return Ok(Vec::new());
        }

        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT contact_user_id
            FROM contacts
            WHERE owner_id = $1 AND is_blocked = FALSE AND contact_user_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(among)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
