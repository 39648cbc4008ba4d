//! Registration, login and password changes
//!
//! # Performance Optimizations
//!
//! - Password hashing/verification runs on the blocking thread pool
//! - The token service is passed by reference (pre-computed keys)

use chatmentor_shared::{
    validation, AccountStatus, ChangePasswordRequest, FieldErrors, LoginResponse, Role,
    UserProfile,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{PasswordService, TokenService};
use crate::config::StorageConfig;
use crate::error::ApiError;
use crate::repositories::{NewUser, UserStore};
use crate::services::document::{DocumentService, Upload};

/// Folder and associated entity used for profile pictures
pub const PROFILE_PICTURE_ENTITY: &str = "profile_pics";

/// Registration form
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub password: String,
    pub confirm_password: String,
    /// Free text from the form, parsed case-insensitively
    pub role: Option<String>,
    pub image: Option<Upload>,
}

/// Authentication service
pub struct AuthService;

impl AuthService {
    /// Register a new user
    ///
    /// All violations are collected before failing, so the caller sees every
    /// problem with the form at once.
    pub async fn register(
        users: &dyn UserStore,
        documents: &DocumentService,
        storage: &StorageConfig,
        input: RegisterInput,
    ) -> Result<UserProfile, ApiError> {
        let mut errors = FieldErrors::new();

        errors.check("firstName", validation::validate_name("First name", &input.first_name));
        errors.check("lastName", validation::validate_name("Last name", &input.last_name));
        errors.check("password", validation::validate_password(&input.password));
        if input.password != input.confirm_password {
            errors.add("confirmPassword", "Passwords do not match.");
        }

        let email = input.email.trim().to_string();
        if !email.is_empty() && users.email_exists(&email).await? {
            errors.add("email", "The email address is already registered.");
        }
        errors.check("email", validation::validate_email(&email));

        let headline = non_blank(input.headline);
        if let Some(headline) = &headline {
            errors.check("headline", validation::validate_headline(headline));
        }
        let bio = non_blank(input.bio);
        if let Some(bio) = &bio {
            errors.check("bio", validation::validate_bio(bio));
        }

        let role = match non_blank(input.role) {
            None => Role::default(),
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => role,
                Err(_) => {
                    errors.add("role", "Role must be one of Student, Mentor or Admin.");
                    Role::default()
                }
            },
        };

        errors.into_result()?;

        let password_hash = PasswordService::hash_async(input.password).await?;
        let user_id = Uuid::new_v4();

        let uploaded = match input.image.filter(|image| !image.bytes.is_empty()) {
            Some(image) => match documents
                .upload(&image, user_id, PROFILE_PICTURE_ENTITY, Some(user_id))
                .await
            {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(error = %e, "profile picture upload failed, using default");
                    None
                }
            },
            None => None,
        };

        let profile_picture_url = uploaded
            .as_ref()
            .map(|doc| doc.file_path.clone())
            .unwrap_or_else(|| storage.default_profile_picture.clone());

        let created = users
            .create(NewUser {
                user_id,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                email,
                headline,
                bio,
                profile_picture_url: Some(profile_picture_url),
                password_hash,
                role,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                if let Some(doc) = uploaded {
                    if let Err(cleanup) = documents.delete(&doc.doc_id.to_string()).await {
                        warn!(error = %cleanup, "failed to remove picture of unregistered user");
                    }
                }
                return Err(e.into());
            }
        };

        info!(user_id = %user.user_id, role = %user.role, "user registered");
        Ok(user.to_profile())
    }

    /// Login with email and password
    ///
    /// Unknown email, wrong password and inactive account all produce the
    /// same `Unauthorized` error.
    pub async fn login(
        users: &dyn UserStore,
        tokens: &TokenService,
        email: &str,
        password: &str,
        client_ip: Option<String>,
    ) -> Result<LoginResponse, ApiError> {
        let Some(user) = users.find_by_email(email.trim()).await? else {
            return Err(ApiError::Unauthorized("login for unknown email".to_string()));
        };

        let valid =
            PasswordService::verify_async(password.to_string(), user.password_hash.clone()).await;
        if !valid {
            users.record_login_failure(user.id).await?;
            warn!(user_id = %user.user_id, "login failed: wrong password");
            return Err(ApiError::Unauthorized("wrong password".to_string()));
        }

        if user.status != AccountStatus::Active {
            warn!(user_id = %user.user_id, status = %user.status, "login refused for inactive account");
            return Err(ApiError::Unauthorized("account not active".to_string()));
        }

        let now = Utc::now();
        users.record_login_success(user.id, client_ip, now).await?;

        let issued = tokens.issue_at(
            user.id,
            user.user_id,
            &user.full_name(),
            user.role,
            tokens.default_ttl(),
            now,
        )?;

        info!(user_id = %user.user_id, "user logged in");
        Ok(LoginResponse {
            profile: user.to_profile(),
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
        })
    }

    /// Change the password of `user_id` after verifying the current one
    pub async fn change_password(
        users: &dyn UserStore,
        user_id: i64,
        request: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        let user = users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

        let mut errors = FieldErrors::new();
        errors.check("newPassword", validation::validate_password(&request.new_password));
        if request.new_password != request.confirm_new_password {
            errors.add("confirmNewPassword", "Passwords do not match.");
        }
        let current_ok =
            PasswordService::verify_async(request.current_password, user.password_hash.clone())
                .await;
        if !current_ok {
            errors.add("currentPassword", "Current password is incorrect.");
        }
        errors.into_result()?;

        let hash = PasswordService::hash_async(request.new_password).await?;
        users.update_password(user.id, &hash, Utc::now()).await?;

        info!(user_id = %user.user_id, "password changed");
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::repositories::MemoryStore;
    use crate::storage::MemoryBlobStore;
    use bytes::Bytes;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        documents: DocumentService,
        tokens: TokenService,
        storage: StorageConfig,
    }

    fn fixture() -> Fixture {
        let mut config = AppConfig::default();
        config.jwt.secret = "unit-test-secret-unit-test-secret".to_string();
        let store = Arc::new(MemoryStore::new());
        let documents = DocumentService::new(
            store.clone(),
            Arc::new(MemoryBlobStore::new(&config.storage)),
        );
        Fixture {
            store,
            documents,
            tokens: TokenService::new(&config.jwt).unwrap(),
            storage: config.storage,
        }
    }

    fn form(email: &str) -> RegisterInput {
        RegisterInput {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            password: "Correct-Horse-1".to_string(),
            confirm_password: "Correct-Horse-1".to_string(),
            ..Default::default()
        }
    }

    async fn register(f: &Fixture, input: RegisterInput) -> Result<UserProfile, ApiError> {
        AuthService::register(&*f.store, &f.documents, &f.storage, input).await
    }

    #[tokio::test]
    async fn test_register_defaults_role_and_picture() {
        let f = fixture();
        let profile = register(&f, form("ada@example.com")).await.unwrap();

        assert_eq!(profile.role, Role::Student);
        assert_eq!(
            profile.profile_picture_url.as_deref(),
            Some("/uploads/profile_pics/default.png")
        );

        let stored = f.store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "Correct-Horse-1");
        assert!(PasswordService::verify("Correct-Horse-1", &stored.password_hash));
    }

    #[tokio::test]
    async fn test_register_collects_all_violations() {
        let f = fixture();
        // A malformed address that is nevertheless already stored
        f.store
            .create(NewUser {
                user_id: Uuid::new_v4(),
                first_name: "X".into(),
                last_name: "Y".into(),
                email: "not-an-email".into(),
                headline: None,
                bio: None,
                profile_picture_url: None,
                password_hash: "h".into(),
                role: Role::Student,
            })
            .await
            .unwrap();

        let mut input = form("not-an-email");
        input.confirm_password = "something else".to_string();

        match register(&f, input).await.unwrap_err() {
            ApiError::Validation(errors) => {
                assert!(errors.contains("confirmPassword"));
                let email = errors.get("email").unwrap();
                assert!(email.contains(&"The email address is already registered.".to_string()));
                assert!(email.contains(&"Invalid email format.".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_with_image_uses_uploaded_path() {
        let f = fixture();
        let mut input = form("pic@example.com");
        input.image = Some(Upload {
            file_name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        });

        let profile = register(&f, input).await.unwrap();
        let url = profile.profile_picture_url.unwrap();
        assert!(url.starts_with("/uploads/profile_pics/"));
        assert!(url.ends_with("_me.png"));
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_role() {
        let f = fixture();
        let mut input = form("role@example.com");
        input.role = Some("superuser".to_string());
        match register(&f, input).await.unwrap_err() {
            ApiError::Validation(errors) => assert!(errors.contains("role")),
            other => panic!("unexpected {other:?}"),
        }

        let mut input = form("mentor@example.com");
        input.role = Some("mentor".to_string());
        assert_eq!(register(&f, input).await.unwrap().role, Role::Mentor);
    }

    #[tokio::test]
    async fn test_login_success_and_failures() {
        let f = fixture();
        register(&f, form("login@example.com")).await.unwrap();

        let response = AuthService::login(
            &*f.store,
            &f.tokens,
            "login@example.com",
            "Correct-Horse-1",
            Some("127.0.0.1".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(response.token_type, "Bearer");
        let claims = f.tokens.validate(&response.token).unwrap();
        assert_eq!(claims.name, "Ada Lovelace");
        assert_eq!(claims.uid, response.profile.user_id);

        let wrong = AuthService::login(&*f.store, &f.tokens, "login@example.com", "nope", None)
            .await
            .unwrap_err();
        let unknown = AuthService::login(&*f.store, &f.tokens, "ghost@example.com", "nope", None)
            .await
            .unwrap_err();
        assert!(matches!(wrong, ApiError::Unauthorized(_)));
        assert!(matches!(unknown, ApiError::Unauthorized(_)));

        let user = f.store.find_by_email("login@example.com").await.unwrap().unwrap();
        assert_eq!(user.failed_login_attempts, 1);
        assert_eq!(user.last_logon_ip.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_change_password() {
        let f = fixture();
        register(&f, form("change@example.com")).await.unwrap();
        let user = f.store.find_by_email("change@example.com").await.unwrap().unwrap();

        let bad = AuthService::change_password(
            &*f.store,
            user.id,
            ChangePasswordRequest {
                current_password: "wrong".to_string(),
                new_password: "New-Password-2".to_string(),
                confirm_new_password: "New-Password-2".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(bad, ApiError::Validation(ref e) if e.contains("currentPassword")));

        AuthService::change_password(
            &*f.store,
            user.id,
            ChangePasswordRequest {
                current_password: "Correct-Horse-1".to_string(),
                new_password: "New-Password-2".to_string(),
                confirm_new_password: "New-Password-2".to_string(),
            },
        )
        .await
        .unwrap();

        let updated = f.store.find_by_email("change@example.com").await.unwrap().unwrap();
        assert!(PasswordService::verify("New-Password-2", &updated.password_hash));
        assert!(updated.password_changed_at.is_some());
    }
}
