use crate::{
    error::{AppError, Result},
    models::{
        purchase::PurchaseAdSlotRequest,
        resource::{ResourceQuery, UpdateResourceRequest},
        submission::CreateSubmissionRequest,
    },
    services::auth::{AdminUser, AuthUser, OptionalAuthUser},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_resources))
        .route("/paid", get(list_paid_resources))
        .route("/submit", post(submit_resource))
        .route("/purchase-ad-slot", post(purchase_ad_slot))
        .route("/:id", get(get_resource).put(update_resource))
}

/// 公开资源列表
/// GET /api/catalog/resources
pub async fn list_resources(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ResourceQuery>,
) -> Result<Json<Value>> {
    let resources = app_state.resource_service.list(&query).await?;

    Ok(Json(json!({
        "success": true,
        "data": resources,
    })))
}

/// 活跃付费资源
/// GET /api/catalog/resources/paid
pub async fn list_paid_resources(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Value>> {
    let resources = app_state.resource_service.list_paid().await?;

    Ok(Json(json!({
        "success": true,
        "data": resources,
    })))
}

/// 单个资源
/// GET /api/catalog/resources/:id
pub async fn get_resource(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let resource = app_state
        .resource_service
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ресурс не найден".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": resource,
    })))
}

/// 提交新条目 (允许匿名)
/// POST /api/catalog/resources/submit
pub async fn submit_resource(
    State(app_state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(request): Json<CreateSubmissionRequest>,
) -> Result<Json<Value>> {
    debug!("Incoming submission: {}", request.title);

    let submission = app_state
        .submission_service
        .create(user.as_ref(), request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "id": submission.id,
        },
        "message": "Заявка отправлена на модерацию",
    })))
}

/// 购买广告位
/// POST /api/catalog/resources/purchase-ad-slot
pub async fn purchase_ad_slot(
    State(app_state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<PurchaseAdSlotRequest>,
) -> Result<Json<Value>> {
    let purchase = app_state.ad_slot_service.purchase(&user.id, &request).await?;

    Ok(Json(json!({
        "success": true,
        "data": purchase,
        "message": "Рекламное место оплачено",
    })))
}

/// 管理员编辑资源
/// PUT /api/catalog/resources/:id
pub async fn update_resource(
    State(app_state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateResourceRequest>,
) -> Result<Json<Value>> {
    let resource = app_state.resource_service.update(&id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": resource,
    })))
}
