use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Validation error: {0}")]
    ValidatorError(#[from] validator::ValidationErrors),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Внутренняя ошибка сервера".to_string(),
                    "DATABASE_ERROR",
                )
            }
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, msg.clone(), "AUTHENTICATION_ERROR")
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, msg.clone(), "AUTHORIZATION_ERROR")
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "VALIDATION_ERROR")
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "NOT_FOUND"),
            AppError::InvalidState(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "INVALID_STATE")
            }
            AppError::CapacityExceeded(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "CAPACITY_EXCEEDED")
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), "CONFLICT"),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Внутренняя ошибка сервера".to_string(),
                    "INTERNAL_ERROR",
                )
            }
            AppError::ExternalService(msg) => {
                tracing::error!("External service error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Ошибка внешнего сервиса".to_string(),
                    "EXTERNAL_SERVICE_ERROR",
                )
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Внутренняя ошибка сервера".to_string(),
                    "SERIALIZATION_ERROR",
                )
            }
            AppError::Request(e) => {
                tracing::error!("Request error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "Ошибка внешнего сервиса".to_string(),
                    "REQUEST_ERROR",
                )
            }
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "Недействительный токен".to_string(),
                    "JWT_ERROR",
                )
            }
            AppError::ValidatorError(e) => {
                let validation_errors = e
                    .field_errors()
                    .iter()
                    .map(|(field, errors)| {
                        (
                            field.to_string(),
                            errors
                                .iter()
                                .map(|e| {
                                    e.message
                                        .as_ref()
                                        .unwrap_or(&"Недопустимое значение".into())
                                        .to_string()
                                })
                                .collect::<Vec<_>>(),
                        )
                    })
                    .collect::<std::collections::HashMap<String, Vec<String>>>();

                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "success": false,
                        "error": {
                            "code": "VALIDATION_ERROR",
                            "message": "Ошибка валидации",
                            "details": validation_errors
                        }
                    })),
                )
                    .into_response();
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": error_message
            }
        }));

        (status, body).into_response()
    }
}

// 便利函数，用于创建常见错误
impl AppError {
    pub fn invalid_state(msg: &str) -> Self {
        Self::InvalidState(msg.to_string())
    }
}

// 从其他错误类型转换
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
