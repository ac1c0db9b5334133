use crate::{
    error::Result,
    models::submission::RejectSubmissionRequest,
    services::auth::AdminUser,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/approve/:id", post(approve_submission))
        .route("/reject/:id", post(reject_submission))
}

/// 待审核队列
/// GET /api/catalog/moderation/pending
pub async fn list_pending(
    State(app_state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Value>> {
    let submissions = app_state.moderation_service.list_pending().await?;

    Ok(Json(json!({
        "success": true,
        "data": submissions,
    })))
}

/// 批准提交
/// POST /api/catalog/moderation/approve/:id
pub async fn approve_submission(
    State(app_state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let resource = app_state
        .moderation_service
        .approve(&id, &admin.id, &admin.username)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": resource,
        "message": "Заявка одобрена",
    })))
}

/// 拒绝提交
/// POST /api/catalog/moderation/reject/:id
pub async fn reject_submission(
    State(app_state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<RejectSubmissionRequest>,
) -> Result<Json<Value>> {
    let submission = app_state
        .moderation_service
        .reject(&id, &admin.id, &admin.username, request.reason)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": submission,
        "message": "Заявка отклонена",
    })))
}
