//! API request and response types
//!
//! All payloads are camelCase on the wire.

use crate::models::{AccountStatus, Role, Tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Envelope
// ============================================================================

/// Outcome tag of an [`Envelope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeStatus {
    Success,
    Fail,
    Error,
}

/// Uniform wrapper returned by every endpoint.
///
/// `Fail` carries caller-correctable data (e.g. a field error map),
/// `Error` carries only a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T> Envelope<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            data: Some(data),
            message: Some(message.into()),
            meta: None,
        }
    }

    pub fn success_with_meta(data: T, message: impl Into<String>, meta: PaginationMeta) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            data: Some(data),
            message: Some(message.into()),
            meta: Some(meta),
        }
    }

    pub fn fail(data: Option<T>, message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Fail,
            data,
            message: Some(message.into()),
            meta: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            data: None,
            message: Some(message.into()),
            meta: None,
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// `?page=&pageSize=` query parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PageQuery {
    /// Row offset of the first item on this page
    pub fn offset(&self) -> i64 {
        (i64::from(self.page.max(1)) - 1) * i64::from(self.page_size)
    }
}

/// Pagination metadata attached to list envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(current_page: u32, page_size: u32, total_records: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_records.div_ceil(u64::from(page_size)) as u32
        };
        Self {
            current_page,
            page_size,
            total_records,
            total_pages,
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password change request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

/// Sanitized profile view, never includes credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    pub profile_picture_url: Option<String>,
}

/// Successful login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Users
// ============================================================================

/// User lookup view returned by the user endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub id: i64,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub profile_picture_url: Option<String>,
    pub last_logon: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
}

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTagRequest {
    pub tag_id: i64,
}

/// Tags attached to one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTags {
    pub user_id: i64,
    pub tags: Vec<Tag>,
}

// ============================================================================
// Audit
// ============================================================================

/// Audit record as exposed to administrators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecordView {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub method: String,
    pub path: String,
    pub query_string: String,
    pub request_body: String,
    pub status_code: u16,
    pub created_at: DateTime<Utc>,
}
