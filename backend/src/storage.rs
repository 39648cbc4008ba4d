//! Blob storage for uploaded files
//!
//! Files are stored as `<uuid>_<sanitized name>` inside a lowercase folder
//! per associated entity, and addressed by the public relative path
//! `"{public_prefix}/{entity}/{file}"`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::repositories::{StoreError, StoreResult};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the public relative path
    async fn put(&self, entity: &str, original_name: &str, bytes: &[u8]) -> StoreResult<String>;

    /// Remove the blob behind a path returned by [`BlobStore::put`].
    /// Missing blobs are not an error.
    async fn delete(&self, public_path: &str) -> StoreResult<()>;
}

/// Reduce a client-supplied file name to a safe final path component
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

fn unique_file_name(original: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), sanitize_file_name(original))
}

fn entity_folder(entity: &str) -> String {
    sanitize_file_name(&entity.to_lowercase())
}

/// Local filesystem store rooted at `uploads_base_path`
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            base_path: PathBuf::from(&config.uploads_base_path),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Map a public path back to a file under the base path
    fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let relative = public_path.strip_prefix(&self.public_prefix)?;
        let mut path = self.base_path.clone();
        for part in relative.split('/').filter(|p| !p.is_empty()) {
            if part == ".." || part == "." {
                return None;
            }
            path.push(part);
        }
        Some(path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, entity: &str, original_name: &str, bytes: &[u8]) -> StoreResult<String> {
        let folder = entity_folder(entity);
        let file_name = unique_file_name(original_name);

        let dir = self.base_path.join(&folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        debug!(folder = %folder, file = %file_name, size = bytes.len(), "stored upload");
        Ok(format!("{}/{}/{}", self.public_prefix, folder, file_name))
    }

    async fn delete(&self, public_path: &str) -> StoreResult<()> {
        let Some(path) = self.resolve(public_path) else {
            return Err(StoreError::NotFound(format!("blob {public_path}")));
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-memory store for tests and database-less runs
#[derive(Default)]
pub struct MemoryBlobStore {
    public_prefix: String,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            blobs: Mutex::default(),
        }
    }

    pub fn get(&self, public_path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().ok()?.get(public_path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, entity: &str, original_name: &str, bytes: &[u8]) -> StoreResult<String> {
        let path = format!(
            "{}/{}/{}",
            self.public_prefix,
            entity_folder(entity),
            unique_file_name(original_name)
        );
        self.blobs
            .lock()
            .map_err(|_| StoreError::Other(anyhow::anyhow!("blob store lock poisoned")))?
            .insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn delete(&self, public_path: &str) -> StoreResult<()> {
        self.blobs
            .lock()
            .map_err(|_| StoreError::Other(anyhow::anyhow!("blob store lock poisoned")))?
            .remove(public_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("me.png", "me.png")]
    #[case("../../etc/passwd", "passwd")]
    #[case("C:\\Users\\x\\photo 1.jpg", "photo_1.jpg")]
    #[case("", "file")]
    #[case(".hidden", "hidden")]
    fn test_sanitize_file_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(input), expected);
    }

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let root = std::env::temp_dir().join(format!("chatmentor-blobs-{}", Uuid::new_v4()));
        let config = StorageConfig {
            uploads_base_path: root.to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        let store = LocalBlobStore::new(&config);

        let path = store.put("Profile_Pics", "avatar.png", b"png-bytes").await.unwrap();
        assert!(path.starts_with("/uploads/profile_pics/"));
        assert!(path.ends_with("_avatar.png"));

        let file = store.resolve(&path).unwrap();
        assert_eq!(tokio::fs::read(&file).await.unwrap(), b"png-bytes");

        store.delete(&path).await.unwrap();
        assert!(!file.exists());
        // Second delete is a no-op
        store.delete(&path).await.unwrap();

        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = LocalBlobStore::new(&StorageConfig::default());
        assert!(store.resolve("/uploads/../secret").is_none());
        assert!(store.resolve("/elsewhere/x.png").is_none());
    }
}
