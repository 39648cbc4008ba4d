//! Tags and user-tag associations

use async_trait::async_trait;
use chatmentor_shared::Tag;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::StoreResult;

#[derive(Debug, Clone, sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
pub trait TagStore: Send + Sync {
    /// All tags ordered by name
    async fn list(&self) -> StoreResult<Vec<Tag>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Tag>>;

    /// Insert the tag unless one with the same name exists
    async fn ensure(&self, name: &str) -> StoreResult<Tag>;

    async fn count(&self) -> StoreResult<i64>;

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<Tag>>;

    /// Idempotent; returns whether a new association was created
    async fn assign(&self, user_id: i64, tag_id: i64) -> StoreResult<bool>;

    /// Returns whether an association was removed
    async fn unassign(&self, user_id: i64, tag_id: i64) -> StoreResult<bool>;
}

/// PostgreSQL tag store
#[derive(Clone)]
pub struct PgTagStore {
    pool: PgPool,
}

impl PgTagStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagStore for PgTagStore {
    async fn list(&self) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT id, name, created_at FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>("SELECT id, name, created_at FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Tag::from))
    }

    async fn ensure(&self, name: &str) -> StoreResult<Tag> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn count(&self) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.id, t.name, t.created_at
            FROM tags t
            JOIN user_tags ut ON ut.tag_id = t.id
            WHERE ut.user_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn assign(&self, user_id: i64, tag_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_tags (user_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unassign(&self, user_id: i64, tag_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_tags WHERE user_id = $1 AND tag_id = $2")
            .bind(user_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
