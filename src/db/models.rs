use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents an atomic permission (resource + action).
/// Corresponds to the `admin_permissions` table. Seeded once at bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminPermission {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub resource: String,
    pub action: String,
}

/// Represents a named bundle of permissions assignable to admin users.
/// Corresponds to the `admin_roles` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminRole {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_builtin: bool,
    pub created_at: DateTime<Utc>,
}

/// A role together with its resolved permission set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: AdminRole,
    pub permissions: Vec<AdminPermission>,
}

/// Represents an administrator account of the control plane.
/// Corresponds to the `admin_users` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An admin user with the role and permission set needed for authorization
/// decisions. Loaded once per request by the auth layer.
#[derive(Debug, Clone)]
pub struct AdminUserWithRole {
    pub user: AdminUser,
    pub role: Option<RoleWithPermissions>,
}

/// Represents an outbound webhook subscription: endpoint, event filter,
/// signing secret and retry policy.
/// Corresponds to the `webhooks` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Webhook {
    pub id: String,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    /// Subscribed event types, stored as a JSONB array of strings.
    pub events: serde_json::Value,
    /// AES-256-GCM-encrypted signing secret; never serialized.
    #[serde(skip_serializing)]
    pub secret: String,
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

impl Webhook {
    /// The subscribed event types as a plain string list.
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_subscribed_to(&self, event_type: &str) -> bool {
        self.events
            .as_array()
            .map(|arr| arr.iter().any(|v| v.as_str() == Some(event_type)))
            .unwrap_or(false)
    }
}

/// One delivery attempt (initial or retry) against a webhook endpoint.
/// Corresponds to the append-only `webhook_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookLog {
    pub id: String,
    pub webhook_id: String,
    pub event_type: String,
    pub event_timestamp: DateTime<Utc>,
    pub request_url: Option<String>,
    pub request_headers: Option<serde_json::Value>,
    pub request_body: Option<serde_json::Value>,
    pub status_code: Option<i32>,
    pub response_body: Option<String>,
    pub response_time_ms: Option<i32>,
    pub attempt: i32,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook_with_events(events: serde_json::Value) -> Webhook {
        Webhook {
            id: "wh-1".to_string(),
            url: "https://example.com/hook".to_string(),
            name: "test".to_string(),
            description: None,
            events,
            secret: String::new(),
            enabled: true,
            retry_enabled: true,
            retry_max_attempts: 3,
            retry_delay_seconds: 60,
            total_calls: 0,
            failed_calls: 0,
            last_called_at: None,
            last_error: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_types_roundtrip() {
        let wh = webhook_with_events(serde_json::json!(["user.created", "user.deleted"]));
        assert_eq!(wh.event_types(), vec!["user.created", "user.deleted"]);
        assert!(wh.is_subscribed_to("user.created"));
        assert!(!wh.is_subscribed_to("user.enabled"));
    }

    #[test]
    fn test_event_types_tolerates_malformed_column() {
        let wh = webhook_with_events(serde_json::json!({"not": "an array"}));
        assert!(wh.event_types().is_empty());
        assert!(!wh.is_subscribed_to("user.created"));
    }
}
