//! User accounts

use async_trait::async_trait;
use chatmentor_shared::{AccountStatus, Role, UserDetails, UserProfile};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{is_unique_violation, StoreError, StoreResult};

/// User record from database
///
/// Carries the password hash; convert with [`UserRecord::to_profile`] or
/// [`UserRecord::to_details`] before returning it to a client.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub status: AccountStatus,
    pub failed_login_attempts: i32,
    pub last_logon: Option<DateTime<Utc>>,
    pub last_logon_ip: Option<String>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            headline: self.headline.clone(),
            bio: self.bio.clone(),
            role: self.role,
            profile_picture_url: self.profile_picture_url.clone(),
        }
    }

    pub fn to_details(&self) -> UserDetails {
        UserDetails {
            id: self.id,
            user_id: self.user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            headline: self.headline.clone(),
            bio: self.bio.clone(),
            role: self.role,
            status: self.status,
            profile_picture_url: self.profile_picture_url.clone(),
            last_logon: self.last_logon,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Input for creating a user
///
/// The external GUID is chosen by the caller so that uploads made before
/// the insert can already reference it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Profile fields a user may change; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
}

/// Credential store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with [`StoreError::DuplicateEmail`] when the
    /// email is taken, including when a concurrent insert won the race.
    async fn create(&self, user: NewUser) -> StoreResult<UserRecord>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<UserRecord>>;

    async fn find_by_guid(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn email_exists(&self, email: &str) -> StoreResult<bool>;

    /// Users ordered by internal id
    async fn list(&self, offset: i64, limit: i64) -> StoreResult<Vec<UserRecord>>;

    async fn count(&self) -> StoreResult<i64>;

    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
        updated_by: Uuid,
    ) -> StoreResult<Option<UserRecord>>;

    /// Reset the failure counter and stamp the logon time and address
    async fn record_login_success(
        &self,
        id: i64,
        ip: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn record_login_failure(&self, id: i64) -> StoreResult<()>;

    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Readiness probe
    async fn ping(&self) -> StoreResult<()>;
}

const USER_COLUMNS: &str = r#"
    id, user_id, first_name, last_name, email, headline, bio,
    profile_picture_url, password_hash, role, status, failed_login_attempts,
    last_logon, last_logon_ip, password_changed_at, created_by, updated_by,
    created_at, updated_at
"#;

/// PostgreSQL user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> StoreResult<UserRecord> {
        let sql = format!(
            r#"
            INSERT INTO users (user_id, first_name, last_name, email, headline, bio,
                               profile_picture_url, password_hash, role, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $1)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user.user_id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.headline)
            .bind(&user.bio)
            .bind(&user.profile_picture_url)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e, "uq_users_email") {
                    StoreError::DuplicateEmail
                } else {
                    StoreError::Database(e)
                }
            })
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_guid(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.0)
    }

    async fn list(&self, offset: i64, limit: i64) -> StoreResult<Vec<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id OFFSET $1 LIMIT $2");
        let users = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn count(&self) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
        updated_by: Uuid,
    ) -> StoreResult<Option<UserRecord>> {
        let sql = format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                headline = COALESCE($4, headline),
                bio = COALESCE($5, bio),
                updated_by = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.headline)
            .bind(changes.bio)
            .bind(updated_by)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn record_login_success(
        &self,
        id: i64,
        ip: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                failed_login_attempts = 0,
                last_logon = $2,
                last_logon_ip = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(ip)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_login_failure(&self, id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE users SET failed_login_attempts = failed_login_attempts + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $2,
                password_changed_at = $3,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
