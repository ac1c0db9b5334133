use crate::{
    error::Result,
    models::{response::ApiResponse, submission::Submission},
    services::auth::AuthUser,
    state::AppState,
};
use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/my", get(list_my_submissions))
}

/// 用户自己的提交历史
/// GET /api/catalog/submissions/my
pub async fn list_my_submissions(
    State(app_state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Submission>>>> {
    let submissions = app_state
        .submission_service
        .list_by_author(&user.id)
        .await?;

    Ok(Json(ApiResponse::success(submissions)))
}
