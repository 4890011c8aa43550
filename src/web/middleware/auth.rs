use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use std::sync::Arc;
use tracing::warn;

use crate::web::error::AppError;
use crate::web::models::{AuthenticatedAdmin, Claims};
use crate::web::AppState;

/// Resolves the bearer token to an admin identity and attaches it to the
/// request. Inactive or deleted accounts are rejected here, before any
/// permission evaluation happens.
pub async fn auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or(AppError::InvalidCredentials)?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding failed");
        AppError::InvalidCredentials
    })?;

    let user = state
        .rbac_service
        .get_user_by_username(&token_data.claims.sub)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or(AppError::InvalidCredentials)?;

    if !user.is_active {
        return Err(AppError::Unauthorized("account is disabled".to_string()));
    }

    req.extensions_mut().insert(AuthenticatedAdmin {
        id: user.id,
        username: user.username,
    });
    Ok(next.run(req).await)
}
