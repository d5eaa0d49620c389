use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::auth_dto::{ApprovalListQuery, ApprovalListResponse, DecisionRequest},
    error::Result,
    services::session::SessionContext,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/admin/approvals",
    params(
        ("status" = Option<String>, Query, description = "pending (default), approved, rejected or all")
    ),
    responses(
        (status = 200, description = "Approval queue", body = Json<ApprovalListResponse>),
        (status = 403, description = "Administrator only")
    )
)]
#[axum::debug_handler]
pub async fn list_approvals(
    State(state): State<AppState>,
    Query(query): Query<ApprovalListQuery>,
) -> Result<impl IntoResponse> {
    let items = state
        .auth_service
        .pending_queue(query.status.unwrap_or_default())
        .await?;
    Ok(Json(ApprovalListResponse {
        total: items.len(),
        items,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/approvals/{id}/decision",
    params(
        ("id" = Uuid, Path, description = "Approval request ID")
    ),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded"),
        (status = 403, description = "Administrator only"),
        (status = 404, description = "Approval request not found")
    )
)]
#[axum::debug_handler]
pub async fn decide(
    State(state): State<AppState>,
    Extension(admin): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<impl IntoResponse> {
    let request = state
        .auth_service
        .decide(id, payload.outcome, &admin)
        .await?;
    Ok(Json(request))
}
