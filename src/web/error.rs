use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Password hashing failed: {0}")]
    PasswordHashingError(String),
    #[error("JWT creation failed: {0}")]
    TokenCreationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AppError::PasswordHashingError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Password hashing error: {msg}"),
            ),
            AppError::TokenCreationError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Token creation error: {msg}"),
            ),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {msg}"),
            ),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<crate::db::services::webhook_service::WebhookError> for AppError {
    fn from(err: crate::db::services::webhook_service::WebhookError) -> Self {
        use crate::db::services::webhook_service::WebhookError;
        match err {
            WebhookError::InvalidEvents(events) => {
                AppError::InvalidInput(format!("Invalid event types: {events:?}"))
            }
            WebhookError::EmptyEvents => {
                AppError::InvalidInput("At least one event type is required".to_string())
            }
            WebhookError::InvalidRetryPolicy(msg) => AppError::InvalidInput(msg),
            WebhookError::NotFound(id) => AppError::NotFound(format!("Webhook not found: {id}")),
            WebhookError::Database(e) => AppError::DatabaseError(e.to_string()),
            WebhookError::Encryption(e) => AppError::InternalServerError(e.to_string()),
            WebhookError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<crate::db::services::rbac_service::RbacError> for AppError {
    fn from(err: crate::db::services::rbac_service::RbacError) -> Self {
        use crate::db::services::rbac_service::RbacError;
        match err {
            RbacError::Conflict(what) => AppError::Conflict(format!("{what} already exists")),
            RbacError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            RbacError::NotAllowed(msg) => AppError::Conflict(msg),
            RbacError::UnknownPermissions(ids) => {
                AppError::InvalidInput(format!("Unknown permission ids: {ids:?}"))
            }
            RbacError::Database(e) => AppError::DatabaseError(e.to_string()),
            RbacError::PasswordHash(msg) => AppError::PasswordHashingError(msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("JSON serialization error: {err}"))
    }
}
