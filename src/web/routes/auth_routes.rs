use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::services::auth_service;
use crate::web::error::AppError;
use crate::web::models::{AuthenticatedAdmin, LoginRequest, LoginResponse};
use crate::web::AppState;

/// Routes that do not pass the auth middleware.
pub fn create_public_auth_router() -> Router<Arc<AppState>> {
    Router::new().route("/login", post(login))
}

pub fn create_auth_router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response =
        auth_service::login_admin(&state.rbac_service, payload, &state.config.jwt_secret).await?;
    Ok(Json(response))
}

async fn me(
    Extension(admin): Extension<AuthenticatedAdmin>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": admin.id,
        "username": admin.username,
    }))
}
