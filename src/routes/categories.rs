use crate::{error::AppError, error::Result, state::AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories))
        .route("/:slug", get(get_category))
}

/// 分类列表 (种子数据)
/// GET /api/catalog/categories
pub async fn list_categories(State(app_state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let categories = app_state.category_service.list().await?;

    Ok(Json(json!({
        "success": true,
        "data": categories,
    })))
}

/// 按 slug 查询单个分类
/// GET /api/catalog/categories/:slug
pub async fn get_category(
    State(app_state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>> {
    let category = app_state
        .category_service
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Категория не найдена".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": category,
    })))
}
