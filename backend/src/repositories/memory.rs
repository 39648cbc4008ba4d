//! In-memory stores
//!
//! Used by router tests and for running the API without PostgreSQL. All
//! state sits behind one mutex, so check-and-insert sequences such as the
//! email uniqueness check are atomic.

use async_trait::async_trait;
use chatmentor_shared::Tag;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    AuditRecord, AuditStore, Document, DocumentStore, NewAuditRecord, NewDocument, NewUser,
    ProfileChanges, ReplacedFile, StoreError, StoreResult, TagStore, UserRecord, UserStore,
};

#[derive(Default)]
struct Inner {
    users: Vec<UserRecord>,
    audit: Vec<AuditRecord>,
    documents: Vec<Document>,
    tags: Vec<Tag>,
    user_tags: BTreeSet<(i64, i64)>,
}

/// Implements every store trait over process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_audit_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent audit inserts fail, simulating an unavailable store
    pub fn fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of stored audit records in insertion order
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.lock().map(|inner| inner.audit.clone()).unwrap_or_default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Other(anyhow::anyhow!("memory store lock poisoned")))
    }
}

fn next_id(len: usize) -> i64 {
    len as i64 + 1
}

fn page<T: Clone>(items: impl Iterator<Item = T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> StoreResult<UserRecord> {
        let mut inner = self.lock()?;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: next_id(inner.users.len()),
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            headline: user.headline,
            bio: user.bio,
            profile_picture_url: user.profile_picture_url,
            password_hash: user.password_hash,
            role: user.role,
            status: Default::default(),
            failed_login_attempts: 0,
            last_logon: None,
            last_logon_ip: None,
            password_changed_at: None,
            created_by: Some(user.user_id),
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<UserRecord>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_guid(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.lock()?.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        Ok(self.lock()?.users.iter().any(|u| u.email == email))
    }

    async fn list(&self, offset: i64, limit: i64) -> StoreResult<Vec<UserRecord>> {
        Ok(page(self.lock()?.users.iter().cloned(), offset, limit))
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.lock()?.users.len() as i64)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
        updated_by: Uuid,
    ) -> StoreResult<Option<UserRecord>> {
        let mut inner = self.lock()?;
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(headline) = changes.headline {
            user.headline = Some(headline);
        }
        if let Some(bio) = changes.bio {
            user.bio = Some(bio);
        }
        user.updated_by = Some(updated_by);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn record_login_success(
        &self,
        id: i64,
        ip: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.failed_login_attempts = 0;
            user.last_logon = Some(at);
            user.last_logon_ip = ip;
        }
        Ok(())
    }

    async fn record_login_failure(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.failed_login_attempts += 1;
        }
        Ok(())
    }

    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(at);
        user.updated_at = at;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert(&self, record: NewAuditRecord) -> StoreResult<AuditRecord> {
        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Other(anyhow::anyhow!("audit store unavailable")));
        }

        let mut inner = self.lock()?;
        let row = AuditRecord {
            id: next_id(inner.audit.len()),
            user_id: record.user_id,
            ip_address: record.ip_address,
            method: record.method,
            path: record.path,
            query_string: record.query_string,
            request_body: record.request_body,
            status_code: i32::from(record.status_code),
            created_at: record.created_at,
        };
        inner.audit.push(row.clone());
        Ok(row)
    }

    async fn list(&self, offset: i64, limit: i64) -> StoreResult<Vec<AuditRecord>> {
        Ok(page(self.lock()?.audit.iter().rev().cloned(), offset, limit))
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.lock()?.audit.len() as i64)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, document: NewDocument) -> StoreResult<Document> {
        let mut inner = self.lock()?;
        let row = Document {
            id: next_id(inner.documents.len()),
            doc_id: document.doc_id,
            file_name: document.file_name,
            file_path: document.file_path,
            content_type: document.content_type,
            file_size: document.file_size,
            uploaded_by: document.uploaded_by,
            uploaded_at: Utc::now(),
            associated_entity: document.associated_entity,
            related_entity_id: document.related_entity_id,
            updated_by: None,
            updated_at: None,
        };
        inner.documents.push(row.clone());
        Ok(row)
    }

    async fn find_by_guid(&self, doc_id: Uuid) -> StoreResult<Option<Document>> {
        Ok(self
            .lock()?
            .documents
            .iter()
            .find(|d| d.doc_id == doc_id)
            .cloned())
    }

    async fn update(&self, doc_id: Uuid, file: ReplacedFile) -> StoreResult<Option<Document>> {
        let mut inner = self.lock()?;
        let Some(row) = inner.documents.iter_mut().find(|d| d.doc_id == doc_id) else {
            return Ok(None);
        };
        row.file_name = file.file_name;
        row.file_path = file.file_path;
        row.content_type = file.content_type;
        row.file_size = file.file_size;
        row.updated_by = Some(file.updated_by);
        row.updated_at = Some(Utc::now());
        Ok(Some(row.clone()))
    }

    async fn delete(&self, doc_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let before = inner.documents.len();
        inner.documents.retain(|d| d.doc_id != doc_id);
        Ok(inner.documents.len() < before)
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Tag>> {
        let mut tags = self.lock()?.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Tag>> {
        Ok(self.lock()?.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn ensure(&self, name: &str) -> StoreResult<Tag> {
        let mut inner = self.lock()?;
        if let Some(tag) = inner.tags.iter().find(|t| t.name == name) {
            return Ok(tag.clone());
        }
        let tag = Tag {
            id: next_id(inner.tags.len()),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        inner.tags.push(tag.clone());
        Ok(tag)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.lock()?.tags.len() as i64)
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<Tag>> {
        let inner = self.lock()?;
        let mut tags: Vec<Tag> = inner
            .tags
            .iter()
            .filter(|t| inner.user_tags.contains(&(user_id, t.id)))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn assign(&self, user_id: i64, tag_id: i64) -> StoreResult<bool> {
        Ok(self.lock()?.user_tags.insert((user_id, tag_id)))
    }

    async fn unassign(&self, user_id: i64, tag_id: i64) -> StoreResult<bool> {
        Ok(self.lock()?.user_tags.remove(&(user_id, tag_id)))
    }
}
