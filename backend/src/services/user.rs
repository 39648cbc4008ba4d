//! User lookup, listing and profile updates

use chatmentor_shared::{
    validation, FieldErrors, PageQuery, PaginationMeta, UpdateProfileRequest, UserDetails,
    UserProfile, MAX_PAGE_SIZE,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::repositories::{ProfileChanges, UserStore};

/// User service
pub struct UserService;

impl UserService {
    pub async fn get_by_id(users: &dyn UserStore, id: i64) -> Result<UserDetails, ApiError> {
        users
            .find_by_id(id)
            .await?
            .map(|u| u.to_details())
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// A malformed GUID is reported as not found
    pub async fn get_by_guid(users: &dyn UserStore, guid: &str) -> Result<UserDetails, ApiError> {
        let Ok(user_id) = Uuid::parse_str(guid.trim()) else {
            debug!(%guid, "malformed user guid");
            return Err(ApiError::NotFound("User not found".to_string()));
        };

        users
            .find_by_guid(user_id)
            .await?
            .map(|u| u.to_details())
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// One page of users plus pagination metadata
    ///
    /// Requires `page >= 1` and `1 <= page_size <= 100`. An empty page is
    /// not an error here; the route decides how to present it.
    pub async fn list_paginated(
        users: &dyn UserStore,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<UserDetails>, PaginationMeta), ApiError> {
        check_page(page, page_size)?;

        let offset = PageQuery { page, page_size }.offset();
        let total = users.count().await?;
        let rows = users.list(offset, i64::from(page_size)).await?;

        let meta = PaginationMeta::new(page, page_size, total.max(0) as u64);
        Ok((rows.iter().map(|u| u.to_details()).collect(), meta))
    }

    /// Apply a partial profile update made by the user themself
    pub async fn update_profile(
        users: &dyn UserStore,
        id: i64,
        actor: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(first_name) = &request.first_name {
            errors.check("firstName", validation::validate_name("First name", first_name));
        }
        if let Some(last_name) = &request.last_name {
            errors.check("lastName", validation::validate_name("Last name", last_name));
        }
        if let Some(headline) = &request.headline {
            errors.check("headline", validation::validate_headline(headline));
        }
        if let Some(bio) = &request.bio {
            errors.check("bio", validation::validate_bio(bio));
        }
        errors.into_result()?;

        let changes = ProfileChanges {
            first_name: request.first_name.map(|v| v.trim().to_string()),
            last_name: request.last_name.map(|v| v.trim().to_string()),
            headline: request.headline,
            bio: request.bio,
        };

        users
            .update_profile(id, changes, actor)
            .await?
            .map(|u| u.to_profile())
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}

/// Validate page parameters shared by every paginated listing
pub fn check_page(page: u32, page_size: u32) -> Result<(), ApiError> {
    if page < 1 {
        return Err(ApiError::InvalidState(format!("page must be >= 1, got {page}")));
    }
    if page_size < 1 || page_size > MAX_PAGE_SIZE {
        return Err(ApiError::InvalidState(format!(
            "pageSize must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MemoryStore, NewUser};
    use chatmentor_shared::Role;
    use rstest::rstest;

    async fn seeded(count: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..count {
            store
                .create(NewUser {
                    user_id: Uuid::new_v4(),
                    first_name: format!("User{i}"),
                    last_name: "Test".to_string(),
                    email: format!("user{i}@example.com"),
                    headline: None,
                    bio: None,
                    profile_picture_url: None,
                    password_hash: "hash".to_string(),
                    role: Role::Student,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_get_by_id_and_guid() {
        let store = seeded(2).await;
        let user = UserService::get_by_id(&store, 2).await.unwrap();
        assert_eq!(user.email, "user1@example.com");

        let by_guid = UserService::get_by_guid(&store, &user.user_id.to_string())
            .await
            .unwrap();
        assert_eq!(by_guid.id, 2);

        assert!(matches!(
            UserService::get_by_id(&store, 99).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            UserService::get_by_guid(&store, "not-a-guid").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_paginated() {
        let store = seeded(25).await;
        let (users, meta) = UserService::list_paginated(&store, 3, 10).await.unwrap();
        assert_eq!(users.len(), 5);
        assert_eq!(users[0].email, "user20@example.com");
        assert_eq!(meta.total_records, 25);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.current_page, 3);

        let (users, _) = UserService::list_paginated(&store, 4, 10).await.unwrap();
        assert!(users.is_empty());
    }

    #[rstest]
    #[case(0, 10)]
    #[case(1, 0)]
    #[case(1, 101)]
    #[tokio::test]
    async fn test_invalid_page_parameters(#[case] page: u32, #[case] size: u32) {
        let store = MemoryStore::new();
        assert!(matches!(
            UserService::list_paginated(&store, page, size).await.unwrap_err(),
            ApiError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let store = seeded(1).await;
        let actor = Uuid::new_v4();
        let profile = UserService::update_profile(
            &store,
            1,
            actor,
            UpdateProfileRequest {
                headline: Some("Rustacean".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(profile.headline.as_deref(), Some("Rustacean"));
        assert_eq!(profile.first_name, "User0");

        let err = UserService::update_profile(
            &store,
            1,
            actor,
            UpdateProfileRequest {
                bio: Some("x".repeat(501)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains("bio")));
    }
}
