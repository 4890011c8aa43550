use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::db::models::AdminUser;
use crate::db::services::rbac_service::RbacService;
use crate::web::error::AppError;
use crate::web::models::{Claims, LoginRequest, LoginResponse};

const TOKEN_TTL_HOURS: i64 = 24;

/// Authenticate an admin by username/password and issue a bearer token.
pub async fn login_admin(
    rbac_service: &RbacService,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "username and password are required".to_string(),
        ));
    }

    let user = rbac_service
        .get_user_by_username(&req.username)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or(AppError::InvalidCredentials)?;

    if !user.is_active {
        return Err(AppError::InvalidCredentials);
    }

    let valid = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("password verification failed: {e}")))?;
    if !valid {
        return Err(AppError::InvalidCredentials);
    }

    rbac_service
        .touch_last_login(&user.id)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    create_token(&user, jwt_secret)
}

pub fn create_token(user: &AdminUser, jwt_secret: &str) -> Result<LoginResponse, AppError> {
    let expiration = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id.clone(),
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user_id: user.id.clone(),
        username: user.username.clone(),
    })
}
