//! Request audit log
//!
//! Records are append-only; the application never updates or deletes them.

use async_trait::async_trait;
use chatmentor_shared::AuditRecordView;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::StoreResult;

/// One persisted HTTP transaction
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: i64,
    /// `None` for anonymous requests
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub method: String,
    pub path: String,
    pub query_string: String,
    pub request_body: String,
    pub status_code: i32,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn to_view(&self) -> AuditRecordView {
        AuditRecordView {
            id: self.id,
            user_id: self.user_id,
            ip_address: self.ip_address.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            query_string: self.query_string.clone(),
            request_body: self.request_body.clone(),
            status_code: u16::try_from(self.status_code).unwrap_or(0),
            created_at: self.created_at,
        }
    }
}

/// Audit record before insertion
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub method: String,
    pub path: String,
    pub query_string: String,
    pub request_body: String,
    pub status_code: u16,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert(&self, record: NewAuditRecord) -> StoreResult<AuditRecord>;

    /// Newest first
    async fn list(&self, offset: i64, limit: i64) -> StoreResult<Vec<AuditRecord>>;

    async fn count(&self) -> StoreResult<i64>;
}

/// PostgreSQL audit store
#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn insert(&self, record: NewAuditRecord) -> StoreResult<AuditRecord> {
        let row = sqlx::query_as::<_, AuditRecord>(
            r#"
            INSERT INTO audit_logs (user_id, ip_address, method, path, query_string,
                                    request_body, status_code, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, ip_address, method, path, query_string,
                      request_body, status_code, created_at
            "#,
        )
        .bind(record.user_id)
        .bind(record.ip_address)
        .bind(record.method)
        .bind(record.path)
        .bind(record.query_string)
        .bind(record.request_body)
        .bind(i32::from(record.status_code))
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list(&self, offset: i64, limit: i64) -> StoreResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, user_id, ip_address, method, path, query_string,
                   request_body, status_code, created_at
            FROM audit_logs
            ORDER BY id DESC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
