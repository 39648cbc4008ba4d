//! Document upload service
//!
//! Stores file bytes through a [`BlobStore`] and keeps metadata in a
//! [`DocumentStore`].

use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::repositories::{Document, DocumentStore, NewDocument, ReplacedFile};
use crate::storage::BlobStore;

/// A file received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Document service
///
/// Holds its collaborators behind `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Store a file and record its metadata
    pub async fn upload(
        &self,
        file: &Upload,
        uploaded_by: Uuid,
        associated_entity: &str,
        related_entity_id: Option<Uuid>,
    ) -> Result<Document, ApiError> {
        if file.bytes.is_empty() {
            return Err(ApiError::BadRequest("Invalid file.".to_string()));
        }
        if associated_entity.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Associated entity cannot be null or empty.".to_string(),
            ));
        }

        let file_path = self
            .blobs
            .put(associated_entity, &file.file_name, &file.bytes)
            .await?;

        let record = NewDocument {
            doc_id: Uuid::new_v4(),
            file_name: file.file_name.clone(),
            file_path: file_path.clone(),
            content_type: file.content_type.clone(),
            file_size: file.bytes.len() as i64,
            uploaded_by,
            associated_entity: Some(associated_entity.to_string()),
            related_entity_id,
        };

        match self.store.insert(record).await {
            Ok(document) => {
                info!(doc_id = %document.doc_id, path = %document.file_path, "document uploaded");
                Ok(document)
            }
            Err(e) => {
                // Don't leave an orphaned blob behind
                if let Err(cleanup) = self.blobs.delete(&file_path).await {
                    warn!(path = %file_path, error = %cleanup, "failed to remove orphaned upload");
                }
                Err(e.into())
            }
        }
    }

    /// Look up a document; a malformed GUID is a bad request
    pub async fn get_by_guid(&self, guid: &str) -> Result<Option<Document>, ApiError> {
        let doc_id = parse_guid(guid)?;
        Ok(self.store.find_by_guid(doc_id).await?)
    }

    /// Replace a document's file, keeping its GUID
    ///
    /// The new blob goes in the same entity folder. The old blob is removed
    /// once the metadata points at the new one. Returns `None` if the
    /// document does not exist.
    pub async fn update(
        &self,
        guid: &str,
        file: &Upload,
        modified_by: Uuid,
    ) -> Result<Option<Document>, ApiError> {
        if file.bytes.is_empty() {
            return Err(ApiError::BadRequest("Invalid replacement file.".to_string()));
        }
        let doc_id = parse_guid(guid)?;
        let Some(existing) = self.store.find_by_guid(doc_id).await? else {
            warn!(%doc_id, "document not found for update");
            return Ok(None);
        };

        let entity = existing.associated_entity.as_deref().unwrap_or("misc");
        let file_path = self.blobs.put(entity, &file.file_name, &file.bytes).await?;

        let replaced = ReplacedFile {
            file_name: file.file_name.clone(),
            file_path: file_path.clone(),
            content_type: file.content_type.clone(),
            file_size: file.bytes.len() as i64,
            updated_by: modified_by,
        };

        let updated = match self.store.update(doc_id, replaced).await {
            Ok(Some(document)) => document,
            outcome => {
                if let Err(cleanup) = self.blobs.delete(&file_path).await {
                    warn!(path = %file_path, error = %cleanup, "failed to remove orphaned upload");
                }
                return Ok(outcome?);
            }
        };

        if let Err(e) = self.blobs.delete(&existing.file_path).await {
            warn!(path = %existing.file_path, error = %e, "failed to remove replaced file");
        }
        info!(%doc_id, path = %updated.file_path, "document replaced");
        Ok(Some(updated))
    }

    /// Remove the blob, then the metadata. Returns `false` if the document
    /// does not exist.
    pub async fn delete(&self, guid: &str) -> Result<bool, ApiError> {
        let doc_id = parse_guid(guid)?;
        let Some(document) = self.store.find_by_guid(doc_id).await? else {
            warn!(%doc_id, "document not found for deletion");
            return Ok(false);
        };

        self.blobs.delete(&document.file_path).await?;
        Ok(self.store.delete(doc_id).await?)
    }
}

fn parse_guid(guid: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(guid.trim()).map_err(|_| ApiError::BadRequest("Invalid GUID format.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::repositories::MemoryStore;
    use crate::storage::MemoryBlobStore;

    fn service() -> (DocumentService, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new(&StorageConfig::default()));
        let service = DocumentService::new(Arc::new(MemoryStore::new()), blobs.clone());
        (service, blobs)
    }

    fn upload(bytes: &'static [u8]) -> Upload {
        Upload {
            file_name: "avatar.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[tokio::test]
    async fn test_upload_get_delete() {
        let (service, blobs) = service();
        let owner = Uuid::new_v4();

        let doc = service
            .upload(&upload(b"img"), owner, "profile_pics", Some(owner))
            .await
            .unwrap();
        assert!(doc.file_path.starts_with("/uploads/profile_pics/"));
        assert_eq!(doc.file_size, 3);
        assert_eq!(doc.uploaded_by, owner);
        assert_eq!(blobs.get(&doc.file_path).as_deref(), Some(&b"img"[..]));

        let found = service
            .get_by_guid(&doc.doc_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.doc_id, doc.doc_id);

        assert!(service.delete(&doc.doc_id.to_string()).await.unwrap());
        assert!(blobs.get(&doc.file_path).is_none());
        assert!(!service.delete(&doc.doc_id.to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_replaces_file_and_stamps_modifier() {
        let (service, blobs) = service();
        let owner = Uuid::new_v4();
        let editor = Uuid::new_v4();

        let doc = service
            .upload(&upload(b"old"), owner, "profile_pics", Some(owner))
            .await
            .unwrap();
        assert!(doc.updated_by.is_none());

        let replacement = Upload {
            file_name: "cv.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"new file"),
        };
        let updated = service
            .update(&doc.doc_id.to_string(), &replacement, editor)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.doc_id, doc.doc_id);
        assert_eq!(updated.file_name, "cv.pdf");
        assert_eq!(updated.content_type, "application/pdf");
        assert_eq!(updated.file_size, 8);
        assert_eq!(updated.uploaded_by, owner);
        assert_eq!(updated.updated_by, Some(editor));
        assert!(updated.updated_at.is_some());
        assert!(updated.file_path.starts_with("/uploads/profile_pics/"));
        assert!(updated.file_path.ends_with("cv.pdf"));

        assert!(blobs.get(&doc.file_path).is_none());
        assert_eq!(blobs.get(&updated.file_path).as_deref(), Some(&b"new file"[..]));

        let found = service
            .get_by_guid(&doc.doc_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.file_path, updated.file_path);
    }

    #[tokio::test]
    async fn test_update_missing_or_empty() {
        let (service, _) = service();
        let editor = Uuid::new_v4();

        let missing = service
            .update(&Uuid::new_v4().to_string(), &upload(b"x"), editor)
            .await
            .unwrap();
        assert!(missing.is_none());

        assert!(matches!(
            service
                .update(&Uuid::new_v4().to_string(), &upload(b""), editor)
                .await
                .unwrap_err(),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            service.update("nope", &upload(b"x"), editor).await.unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let (service, _) = service();
        let err = service
            .upload(&upload(b""), Uuid::new_v4(), "profile_pics", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_blank_entity_rejected() {
        let (service, _) = service();
        let err = service
            .upload(&upload(b"x"), Uuid::new_v4(), "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_malformed_guid_is_bad_request() {
        let (service, _) = service();
        assert!(matches!(
            service.get_by_guid("not-a-guid").await.unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }
}
