//! Caller's own profile

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::ApiJson;
use crate::services::UserService;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chatmentor_shared::{Envelope, UpdateProfileRequest, UserProfile};

/// Create profile routes
pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/", get(get_profile).put(update_profile))
}

/// GET /profile
async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Envelope<UserProfile>>> {
    let user = state
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(Envelope::success(
        user.to_profile(),
        "Profile retrieved successfully",
    )))
}

/// PUT /profile
async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<Envelope<UserProfile>>> {
    let profile =
        UserService::update_profile(state.users.as_ref(), auth.user_id, auth.user_guid, req)
            .await?;
    Ok(Json(Envelope::success(profile, "Profile updated successfully")))
}
