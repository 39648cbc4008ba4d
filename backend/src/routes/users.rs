//! User lookup and user-tag routes

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::{ApiJson, ApiPath, ApiQuery};
use crate::services::{TagService, UserService};
use crate::state::AppState;
use axum::{
    extract::State,
    routing::{delete, get},
    Json, Router,
};
use chatmentor_shared::{AssignTagRequest, Envelope, PageQuery, Role, UserDetails, UserTags};

/// Create user routes (all require a valid token)
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/guid/:guid", get(get_user_by_guid))
        .route("/:id", get(get_user_by_id))
        .route("/:id/tags", get(get_user_tags).post(assign_tag))
        .route("/:id/tags/:tag_id", delete(unassign_tag))
}

/// GET /users?page=&pageSize=
///
/// An empty page is reported as 404.
async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Envelope<Vec<UserDetails>>>> {
    let (users, meta) =
        UserService::list_paginated(state.users.as_ref(), query.page, query.page_size).await?;

    if users.is_empty() {
        return Err(ApiError::NotFound("No users found".to_string()));
    }

    Ok(Json(Envelope::success_with_meta(
        users,
        "Users retrieved successfully",
        meta,
    )))
}

/// GET /users/:id
async fn get_user_by_id(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Envelope<UserDetails>>> {
    let user = UserService::get_by_id(state.users.as_ref(), id).await?;
    Ok(Json(Envelope::success(user, "User retrieved successfully")))
}

/// GET /users/guid/:guid
async fn get_user_by_guid(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(guid): ApiPath<String>,
) -> ApiResult<Json<Envelope<UserDetails>>> {
    let user = UserService::get_by_guid(state.users.as_ref(), &guid).await?;
    Ok(Json(Envelope::success(user, "User retrieved successfully")))
}

/// GET /users/:id/tags
async fn get_user_tags(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Envelope<UserTags>>> {
    let tags = TagService::user_tags(state.users.as_ref(), state.tags.as_ref(), id).await?;
    Ok(Json(Envelope::success(tags, "Tags retrieved successfully")))
}

/// POST /users/:id/tags (Admin)
async fn assign_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<AssignTagRequest>,
) -> ApiResult<Json<Envelope<UserTags>>> {
    auth.require_role(Role::Admin)?;
    let tags =
        TagService::assign(state.users.as_ref(), state.tags.as_ref(), id, req.tag_id).await?;
    Ok(Json(Envelope::success(tags, "Tag assigned successfully")))
}

/// DELETE /users/:id/tags/:tag_id (Admin)
async fn unassign_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((id, tag_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Envelope<UserTags>>> {
    auth.require_role(Role::Admin)?;
    let tags = TagService::unassign(state.users.as_ref(), state.tags.as_ref(), id, tag_id).await?;
    Ok(Json(Envelope::success(tags, "Tag removed successfully")))
}
