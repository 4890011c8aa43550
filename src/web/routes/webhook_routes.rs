use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::rbac::require_permission;
use crate::web::error::AppError;
use crate::web::models::{
    AuthenticatedAdmin, CleanupRequest, CleanupResponse, CreateWebhookRequest,
    CreatedWebhookResponse, EventListResponse, LogListQuery, UpdateWebhookRequest,
    WebhookListQuery, WebhookListResponse, WebhookLogListResponse, WebhookResponse,
};
use crate::web::AppState;
use crate::webhooks::dispatcher::AttemptResult;
use crate::webhooks::events::WEBHOOK_EVENTS;

pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_webhooks).post(create_webhook))
        .route("/events", get(list_events))
        .route("/logs/recent", get(recent_logs))
        .route("/logs/cleanup", post(cleanup_logs))
        .route(
            "/{id}",
            get(get_webhook).put(update_webhook).delete(delete_webhook),
        )
        .route("/{id}/toggle", post(toggle_webhook))
        .route("/{id}/test", post(test_webhook))
        .route("/{id}/logs", get(webhook_logs))
        .route("/{id}/stats", get(webhook_stats))
}

async fn list_webhooks(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Query(query): Query<WebhookListQuery>,
) -> Result<Json<WebhookListResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:webhook")?;

    let (webhooks, total) = state
        .webhook_service
        .list_webhooks(query.skip, query.limit.clamp(1, 100), query.enabled_only)
        .await?;
    Ok(Json(WebhookListResponse {
        total,
        items: webhooks.into_iter().map(WebhookResponse::from).collect(),
    }))
}

async fn create_webhook(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Json(payload): Json<CreateWebhookRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:webhook")?;

    let (webhook, secret) = state
        .webhook_service
        .create_webhook(payload, Some(admin.username))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedWebhookResponse {
            webhook: WebhookResponse::from(webhook),
            secret,
        }),
    ))
}

async fn get_webhook(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<Json<WebhookResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:webhook")?;

    let webhook = state.webhook_service.get_webhook(&id).await?;
    Ok(Json(WebhookResponse::from(webhook)))
}

async fn update_webhook(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
    Json(patch): Json<UpdateWebhookRequest>,
) -> Result<Json<WebhookResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:webhook")?;

    let webhook = state.webhook_service.update_webhook(&id, patch).await?;
    Ok(Json(WebhookResponse::from(webhook)))
}

async fn delete_webhook(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "delete:webhook")?;

    state.webhook_service.delete_webhook(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_webhook(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<Json<WebhookResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:webhook")?;

    let webhook = state.webhook_service.toggle_webhook(&id).await?;
    Ok(Json(WebhookResponse::from(webhook)))
}

/// Single manual delivery attempt; unlike event dispatch the outcome is
/// returned synchronously.
async fn test_webhook(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<Json<AttemptResult>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "write:webhook")?;

    let result = state.dispatcher.test_webhook(&id).await?;
    Ok(Json(result))
}

async fn webhook_logs(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
    Query(query): Query<LogListQuery>,
) -> Result<Json<WebhookLogListResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:webhook")?;

    let (logs, total) = state
        .webhook_service
        .get_webhook_logs(&id, query.skip, query.limit.clamp(1, 200))
        .await?;
    Ok(Json(WebhookLogListResponse { total, items: logs }))
}

async fn webhook_stats(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:webhook")?;

    let stats = state.webhook_service.get_webhook_stats(&id).await?;
    Ok(Json(stats))
}

async fn recent_logs(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Query(query): Query<LogListQuery>,
) -> Result<Json<WebhookLogListResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "read:webhook")?;

    let (logs, total) = state
        .webhook_service
        .get_recent_logs(query.hours, query.skip, query.limit.clamp(1, 200))
        .await?;
    Ok(Json(WebhookLogListResponse { total, items: logs }))
}

async fn cleanup_logs(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Json(payload): Json<CleanupRequest>,
) -> Result<Json<CleanupResponse>, AppError> {
    let principal = state.rbac_service.load_principal(&admin.id).await?;
    require_permission(&principal, "delete:webhook")?;

    let deleted = state.webhook_service.cleanup_old_logs(payload.days).await?;
    Ok(Json(CleanupResponse { deleted }))
}

/// The closed event vocabulary, for client UIs.
async fn list_events() -> Json<EventListResponse> {
    Json(EventListResponse {
        total: WEBHOOK_EVENTS.len(),
        events: WEBHOOK_EVENTS.to_vec(),
    })
}
