//! Tag catalogue

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::TagService;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chatmentor_shared::{Envelope, Tag};

pub fn tag_routes() -> Router<AppState> {
    Router::new().route("/", get(list_tags))
}

/// GET /tags
async fn list_tags(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<Json<Envelope<Vec<Tag>>>> {
    let tags = TagService::list(state.tags.as_ref()).await?;
    Ok(Json(Envelope::success(tags, "Tags retrieved successfully")))
}
