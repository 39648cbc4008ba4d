//! Registration, login and password change endpoints
//!
//! Registration is a multipart form so a profile picture can ride along.

use crate::audit::ClientIp;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::ApiJson;
use crate::services::{AuthService, RegisterInput, Upload};
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chatmentor_shared::{ChangePasswordRequest, Envelope, LoginRequest, LoginResponse, UserProfile};
use tracing::debug;

/// Multipart overhead allowed on top of the image itself
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create auth routes
pub fn auth_routes(state: &AppState) -> Router<AppState> {
    let register_limit = state.config.storage.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/register",
            post(register).layer(DefaultBodyLimit::max(register_limit)),
        )
        .route("/login", post(login))
        .route("/change-password", post(change_password))
}

/// Register a new user
///
/// POST /auth/register (multipart/form-data)
async fn register(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<UserProfile>>)> {
    let input = read_register_form(multipart.map_err(multipart_error)?).await?;
    let profile = AuthService::register(
        state.users.as_ref(),
        &state.documents,
        &state.config.storage,
        input,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(profile, "Registration successful.")),
    ))
}

/// Login with email and password
///
/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Envelope<LoginResponse>>> {
    let response = AuthService::login(
        state.users.as_ref(),
        state.jwt(),
        &req.email,
        &req.password,
        client_ip,
    )
    .await?;

    Ok(Json(Envelope::success(response, "Login successful.")))
}

/// Change the caller's password
///
/// POST /auth/change-password
async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    AuthService::change_password(state.users.as_ref(), auth.user_id, req).await?;
    Ok(Json(Envelope::success((), "Password changed successfully.")))
}

fn multipart_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart form: {e}"))
}

/// Collect the registration form fields; unknown fields are ignored
async fn read_register_form(mut multipart: Multipart) -> ApiResult<RegisterInput> {
    let mut input = RegisterInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if matches!(name.as_str(), "image" | "imageFile") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if !bytes.is_empty() {
                input.image = Some(Upload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "firstName" => input.first_name = value,
            "lastName" => input.last_name = value,
            "email" => input.email = value,
            "headline" => input.headline = Some(value),
            "bio" => input.bio = Some(value),
            "password" => input.password = value,
            "confirmPassword" => input.confirm_password = value,
            "role" => input.role = Some(value),
            other => debug!(field = other, "ignoring unknown registration field"),
        }
    }

    Ok(input)
}
