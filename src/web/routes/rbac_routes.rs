use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::db::models::{AdminUser, RoleWithPermissions};
use crate::rbac::require_permission;
use crate::web::error::AppError;
use crate::web::models::{
    AdminUserCreateRequest, AdminUserListResponse, AssignRoleRequest, AuthenticatedAdmin,
    PermissionListResponse, RoleCreateRequest, RoleListResponse, RoleUpdateRequest,
};
use crate::web::AppState;

pub fn create_rbac_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/permissions", get(list_permissions))
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/users", get(list_admin_users).post(create_admin_user))
        .route("/users/{id}/role", put(assign_role))
        .route("/users/{id}/enable", post(enable_admin_user))
        .route("/users/{id}/disable", post(disable_admin_user))
}

async fn list_permissions(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
) -> Result<Json<PermissionListResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:role")?;

    let permissions = state.rbac_service.list_permissions().await?;
    Ok(Json(PermissionListResponse {
        total: permissions.len(),
        items: permissions,
    }))
}

async fn list_roles(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
) -> Result<Json<RoleListResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:role")?;

    let roles = state.rbac_service.list_roles().await?;
    Ok(Json(RoleListResponse {
        total: roles.len(),
        items: roles,
    }))
}

async fn get_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:role")?;

    Ok(Json(state.rbac_service.get_role(&id).await?))
}

async fn create_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Json(payload): Json<RoleCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:role")?;

    let role = state
        .rbac_service
        .create_role(
            &payload.name,
            payload.description.as_deref(),
            &payload.permission_ids,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
    Json(payload): Json<RoleUpdateRequest>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:role")?;

    let role = state
        .rbac_service
        .update_role_permissions(&id, &payload.permission_ids)
        .await?;
    Ok(Json(role))
}

async fn delete_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "delete:role")?;

    state.rbac_service.delete_role(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_admin_users(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
) -> Result<Json<AdminUserListResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:admin")?;

    let users = state.rbac_service.list_admin_users().await?;
    Ok(Json(AdminUserListResponse {
        total: users.len(),
        items: users,
    }))
}

async fn create_admin_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Json(payload): Json<AdminUserCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:admin")?;

    if payload.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let user = state
        .rbac_service
        .create_admin_user(&payload.username, &payload.password, &payload.role_id)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn assign_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
    Json(payload): Json<AssignRoleRequest>,
) -> Result<Json<AdminUser>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:admin")?;

    let user = state.rbac_service.assign_role(&id, &payload.role_id).await?;
    Ok(Json(user))
}

async fn enable_admin_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<Json<AdminUser>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:admin")?;

    let user = state.rbac_service.enable_user(&id).await?;
    Ok(Json(user))
}

async fn disable_admin_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<Json<AdminUser>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:admin")?;

    let user = state.rbac_service.disable_user(&id).await?;
    Ok(Json(user))
}
