use crate::{
    error::Result,
    models::user::TelegramAuthPayload,
    services::auth::AuthUser,
    state::AppState,
};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/telegram", post(telegram_login))
        .route("/me", get(get_current_user))
}

/// Telegram 登录小部件回调
/// POST /api/catalog/auth/telegram
pub async fn telegram_login(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TelegramAuthPayload>,
) -> Result<Json<Value>> {
    debug!("Telegram login attempt for user {}", payload.id);

    app_state.auth_service.verify_telegram_auth(&payload)?;
    let (user, token) = app_state.auth_service.issue_token(&payload)?;

    info!("User {} ({}) logged in", user.id, user.username);

    Ok(Json(json!({
        "success": true,
        "data": {
            "user": user,
            "token": token,
        }
    })))
}

/// 当前用户信息
/// GET /api/catalog/auth/me
pub async fn get_current_user(user: AuthUser) -> Result<Json<Value>> {
    Ok(Json(json!({
        "success": true,
        "data": {
            "user": user,
        }
    })))
}
