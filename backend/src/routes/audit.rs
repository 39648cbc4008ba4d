//! Audit log browsing (Admin only)

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::routes::ApiQuery;
use crate::services::user::check_page;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chatmentor_shared::{AuditRecordView, Envelope, PageQuery, PaginationMeta, Role};

pub fn audit_routes() -> Router<AppState> {
    Router::new().route("/", get(list_audit_records))
}

/// GET /audit?page=&pageSize=
///
/// Newest records first.
async fn list_audit_records(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Envelope<Vec<AuditRecordView>>>> {
    auth.require_role(Role::Admin)?;
    check_page(query.page, query.page_size)?;

    let total = state.audit.count().await?;
    let records = state
        .audit
        .list(query.offset(), i64::from(query.page_size))
        .await?;

    let meta = PaginationMeta::new(query.page, query.page_size, total.max(0) as u64);
    Ok(Json(Envelope::success_with_meta(
        records.iter().map(|r| r.to_view()).collect(),
        "Audit records retrieved successfully",
        meta,
    )))
}
