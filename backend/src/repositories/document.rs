//! Uploaded document metadata

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::StoreResult;

/// Document metadata; the bytes live in the blob store at `file_path`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub doc_id: Uuid,
    pub file_name: String,
    /// Public relative path, e.g. `/uploads/profile_pics/<uuid>_me.png`
    pub file_path: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub associated_entity: Option<String>,
    pub related_entity_id: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub doc_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_by: Uuid,
    pub associated_entity: Option<String>,
    pub related_entity_id: Option<Uuid>,
}

/// New file details for an existing document
#[derive(Debug, Clone)]
pub struct ReplacedFile {
    pub file_name: String,
    pub file_path: String,
    pub content_type: String,
    pub file_size: i64,
    pub updated_by: Uuid,
}

const DOCUMENT_COLUMNS: &str = "id, doc_id, file_name, file_path, content_type, file_size, \
     uploaded_by, uploaded_at, associated_entity, related_entity_id, updated_by, updated_at";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, document: NewDocument) -> StoreResult<Document>;

    async fn find_by_guid(&self, doc_id: Uuid) -> StoreResult<Option<Document>>;

    /// Point the document at a new file, stamping `updated_by`/`updated_at`.
    /// `None` if the document does not exist.
    async fn update(&self, doc_id: Uuid, file: ReplacedFile) -> StoreResult<Option<Document>>;

    /// Returns whether a row was removed
    async fn delete(&self, doc_id: Uuid) -> StoreResult<bool>;
}

/// PostgreSQL document store
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, document: NewDocument) -> StoreResult<Document> {
        let row = sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO documents (doc_id, file_name, file_path, content_type, file_size,
                                   uploaded_by, associated_entity, related_entity_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(document.doc_id)
        .bind(document.file_name)
        .bind(document.file_path)
        .bind(document.content_type)
        .bind(document.file_size)
        .bind(document.uploaded_by)
        .bind(document.associated_entity)
        .bind(document.related_entity_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_guid(&self, doc_id: Uuid) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE doc_id = $1"
        ))
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, doc_id: Uuid, file: ReplacedFile) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, Document>(&format!(
            r#"
            UPDATE documents
            SET file_name = $2, file_path = $3, content_type = $4, file_size = $5,
                updated_by = $6, updated_at = NOW()
            WHERE doc_id = $1
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(doc_id)
        .bind(file.file_name)
        .bind(file.file_path)
        .bind(file.content_type)
        .bind(file.file_size)
        .bind(file.updated_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, doc_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE doc_id = $1")
            .bind(doc_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
