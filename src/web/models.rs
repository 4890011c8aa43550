use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{AdminPermission, AdminUser, RoleWithPermissions, Webhook, WebhookLog};
use crate::webhooks::events::EventInfo;

// ---- auth ------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    pub exp: usize,
}

/// Identity attached to the request by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
}

// ---- webhooks --------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWebhookRequest {
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub events: Vec<String>,
    pub secret: Option<String>,
    pub retry_enabled: Option<bool>,
}

/// Typed partial update; every field individually optional, absent fields
/// stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWebhookRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub retry_enabled: Option<bool>,
    pub retry_max_attempts: Option<i32>,
    pub retry_delay_seconds: Option<i32>,
}

/// Webhook as exposed over the API. The signing secret is omitted; it is
/// echoed only once, at creation time.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub id: String,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub events: Vec<String>,
    pub enabled: bool,
    pub retry_enabled: bool,
    pub retry_max_attempts: i32,
    pub retry_delay_seconds: i32,
    pub total_calls: i64,
    pub failed_calls: i64,
    pub last_called_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Webhook> for WebhookResponse {
    fn from(w: Webhook) -> Self {
        let events = w.event_types();
        WebhookResponse {
            id: w.id,
            url: w.url,
            name: w.name,
            description: w.description,
            events,
            enabled: w.enabled,
            retry_enabled: w.retry_enabled,
            retry_max_attempts: w.retry_max_attempts,
            retry_delay_seconds: w.retry_delay_seconds,
            total_calls: w.total_calls,
            failed_calls: w.failed_calls,
            last_called_at: w.last_called_at,
            last_error: w.last_error,
            created_by: w.created_by,
            created_at: w.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedWebhookResponse {
    #[serde(flatten)]
    pub webhook: WebhookResponse,
    /// One-time echo of the signing secret.
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub enabled_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_log_limit")]
    pub limit: i64,
    #[serde(default = "default_hours")]
    pub hours: i64,
}

fn default_limit() -> i64 {
    10
}

fn default_log_limit() -> i64 {
    50
}

fn default_hours() -> i64 {
    24
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookListResponse {
    pub total: i64,
    pub items: Vec<WebhookResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookLogListResponse {
    pub total: i64,
    pub items: Vec<WebhookLog>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventListResponse {
    pub total: usize,
    pub events: Vec<EventInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupRequest {
    #[serde(default = "default_retention_days")]
    pub days: i64,
}

fn default_retention_days() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub deleted: u64,
}

// ---- rbac ------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PermissionListResponse {
    pub total: usize,
    pub items: Vec<AdminPermission>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleListResponse {
    pub total: usize,
    pub items: Vec<RoleWithPermissions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub permission_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdateRequest {
    pub permission_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminUserListResponse {
    pub total: usize,
    pub items: Vec<AdminUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminUserCreateRequest {
    pub username: String,
    pub password: String,
    pub role_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: String,
}
