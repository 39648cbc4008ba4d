//! Tags and user-tag associations

use chatmentor_shared::{Tag, UserTags};
use tracing::info;

use crate::error::ApiError;
use crate::repositories::{TagStore, UserStore};

/// Tag service
pub struct TagService;

impl TagService {
    pub async fn list(tags: &dyn TagStore) -> Result<Vec<Tag>, ApiError> {
        Ok(tags.list().await?)
    }

    pub async fn user_tags(
        users: &dyn UserStore,
        tags: &dyn TagStore,
        user_id: i64,
    ) -> Result<UserTags, ApiError> {
        ensure_user(users, user_id).await?;
        Ok(UserTags {
            user_id,
            tags: tags.list_for_user(user_id).await?,
        })
    }

    /// Attach a tag; assigning an already attached tag is a no-op
    pub async fn assign(
        users: &dyn UserStore,
        tags: &dyn TagStore,
        user_id: i64,
        tag_id: i64,
    ) -> Result<UserTags, ApiError> {
        ensure_user(users, user_id).await?;
        if tags.find_by_id(tag_id).await?.is_none() {
            return Err(ApiError::NotFound("Tag not found".to_string()));
        }

        if tags.assign(user_id, tag_id).await? {
            info!(user_id, tag_id, "tag assigned");
        }
        Self::user_tags(users, tags, user_id).await
    }

    pub async fn unassign(
        users: &dyn UserStore,
        tags: &dyn TagStore,
        user_id: i64,
        tag_id: i64,
    ) -> Result<UserTags, ApiError> {
        ensure_user(users, user_id).await?;
        if !tags.unassign(user_id, tag_id).await? {
            return Err(ApiError::NotFound("Tag is not assigned to this user".to_string()));
        }

        info!(user_id, tag_id, "tag removed");
        Self::user_tags(users, tags, user_id).await
    }
}

async fn ensure_user(users: &dyn UserStore, user_id: i64) -> Result<(), ApiError> {
    match users.find_by_id(user_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("User not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MemoryStore, NewUser};
    use chatmentor_shared::Role;
    use uuid::Uuid;

    async fn store_with_user() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create(NewUser {
                user_id: Uuid::new_v4(),
                first_name: "Tess".to_string(),
                last_name: "Tagger".to_string(),
                email: "tess@example.com".to_string(),
                headline: None,
                bio: None,
                profile_picture_url: None,
                password_hash: "hash".to_string(),
                role: Role::Student,
            })
            .await
            .unwrap();
        for name in ["AI", "Cybersecurity"] {
            store.ensure(name).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let store = store_with_user().await;
        TagService::assign(&store, &store, 1, 1).await.unwrap();
        let tags = TagService::assign(&store, &store, 1, 1).await.unwrap();
        assert_eq!(tags.tags.len(), 1);
        assert_eq!(tags.tags[0].name, "AI");
    }

    #[tokio::test]
    async fn test_unknown_user_or_tag() {
        let store = store_with_user().await;
        assert!(matches!(
            TagService::assign(&store, &store, 9, 1).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            TagService::assign(&store, &store, 1, 99).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_unassign() {
        let store = store_with_user().await;
        TagService::assign(&store, &store, 1, 2).await.unwrap();
        let tags = TagService::unassign(&store, &store, 1, 2).await.unwrap();
        assert!(tags.tags.is_empty());
        assert!(matches!(
            TagService::unassign(&store, &store, 1, 2).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
