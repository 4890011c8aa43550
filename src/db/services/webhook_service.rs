//! Webhook registry and delivery-log store.
//!
//! Owns all persistence for webhook subscriptions, their append-only
//! delivery logs and the derived statistics. Delivery execution lives in
//! `crate::webhooks::dispatcher`; it calls back into [`WebhookService`] to
//! record each attempt.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{Webhook, WebhookLog};
use crate::services::encryption_service::{self, EncryptionError};
use crate::web::models::{CreateWebhookRequest, UpdateWebhookRequest};
use crate::webhooks::{events, signing};

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid event types: {0:?}")]
    InvalidEvents(Vec<String>),
    #[error("At least one event type is required")]
    EmptyEvents,
    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),
    #[error("Webhook not found: {0}")]
    NotFound(String),
    #[error("Secret handling failed: {0}")]
    Encryption(#[from] EncryptionError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Rolling statistics for one webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookStats {
    pub webhook_id: String,
    pub name: String,
    pub total_calls: i64,
    pub failed_calls: i64,
    pub success_rate: f64,
    pub last_called_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub recent_calls_24h: i64,
    pub recent_failures_24h: i64,
    pub avg_response_time_ms: f64,
}

/// Everything the dispatcher knows about one finished delivery attempt.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub webhook_id: String,
    pub event_type: String,
    pub event_timestamp: DateTime<Utc>,
    pub request_url: String,
    pub request_headers: Option<serde_json::Value>,
    pub request_body: Option<serde_json::Value>,
    pub status_code: Option<i32>,
    pub response_body: Option<String>,
    pub response_time_ms: Option<i32>,
    pub attempt: i32,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn success_rate(total_calls: i64, failed_calls: i64) -> f64 {
    if total_calls > 0 {
        (total_calls - failed_calls) as f64 / total_calls as f64 * 100.0
    } else {
        0.0
    }
}

#[derive(Clone)]
pub struct WebhookService {
    db_pool: PgPool,
    encryption_key: String,
}

impl WebhookService {
    pub fn new(db_pool: PgPool, encryption_key: String) -> Self {
        Self {
            db_pool,
            encryption_key,
        }
    }

    /// Create a subscription. Returns the stored row plus the plaintext
    /// secret, which is echoed to the caller exactly once and never again.
    pub async fn create_webhook(
        &self,
        payload: CreateWebhookRequest,
        created_by: Option<String>,
    ) -> Result<(Webhook, String), WebhookError> {
        if payload.events.is_empty() {
            return Err(WebhookError::EmptyEvents);
        }
        let invalid = events::invalid_events(&payload.events);
        if !invalid.is_empty() {
            return Err(WebhookError::InvalidEvents(invalid));
        }

        let plaintext_secret = payload.secret.unwrap_or_else(signing::generate_secret);
        let sealed_secret =
            encryption_service::encrypt_secret(&plaintext_secret, &self.encryption_key)?;

        let webhook = sqlx::query_as::<_, Webhook>(
            r#"
            INSERT INTO webhooks
                (id, url, name, description, events, secret, enabled,
                 retry_enabled, retry_max_attempts, retry_delay_seconds,
                 created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, 3, 60, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&payload.url)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(serde_json::json!(payload.events))
        .bind(&sealed_secret)
        .bind(payload.retry_enabled.unwrap_or(true))
        .bind(&created_by)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(webhook = %webhook.name, url = %webhook.url, "webhook created");
        Ok((webhook, plaintext_secret))
    }

    /// Stable pagination ordered by creation time; total is independent of
    /// the page bounds.
    pub async fn list_webhooks(
        &self,
        skip: i64,
        limit: i64,
        enabled_only: bool,
    ) -> Result<(Vec<Webhook>, i64), WebhookError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM webhooks WHERE ($1 = FALSE OR enabled = TRUE)",
        )
        .bind(enabled_only)
        .fetch_one(&self.db_pool)
        .await?;

        let webhooks = sqlx::query_as::<_, Webhook>(
            r#"
            SELECT * FROM webhooks
            WHERE ($1 = FALSE OR enabled = TRUE)
            ORDER BY created_at, id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(enabled_only)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok((webhooks, total))
    }

    pub async fn get_webhook(&self, webhook_id: &str) -> Result<Webhook, WebhookError> {
        sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE id = $1")
            .bind(webhook_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| WebhookError::NotFound(webhook_id.to_string()))
    }

    /// All enabled subscriptions whose event set contains `event_type`.
    pub async fn subscribers_for(&self, event_type: &str) -> Result<Vec<Webhook>, WebhookError> {
        let enabled = sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE enabled = TRUE")
            .fetch_all(&self.db_pool)
            .await?;
        Ok(enabled
            .into_iter()
            .filter(|w| w.is_subscribed_to(event_type))
            .collect())
    }

    /// Typed partial update; unspecified fields are left untouched.
    pub async fn update_webhook(
        &self,
        webhook_id: &str,
        patch: UpdateWebhookRequest,
    ) -> Result<Webhook, WebhookError> {
        if let Some(events) = &patch.events {
            if events.is_empty() {
                return Err(WebhookError::EmptyEvents);
            }
            let invalid = events::invalid_events(events);
            if !invalid.is_empty() {
                return Err(WebhookError::InvalidEvents(invalid));
            }
        }
        if let Some(attempts) = patch.retry_max_attempts {
            if !(1..=10).contains(&attempts) {
                return Err(WebhookError::InvalidRetryPolicy(format!(
                    "retry_max_attempts must be within [1, 10], got {attempts}"
                )));
            }
        }
        if let Some(delay) = patch.retry_delay_seconds {
            if !(10..=3600).contains(&delay) {
                return Err(WebhookError::InvalidRetryPolicy(format!(
                    "retry_delay_seconds must be within [10, 3600], got {delay}"
                )));
            }
        }

        let webhook = sqlx::query_as::<_, Webhook>(
            r#"
            UPDATE webhooks SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                url = COALESCE($4, url),
                events = COALESCE($5, events),
                enabled = COALESCE($6, enabled),
                retry_enabled = COALESCE($7, retry_enabled),
                retry_max_attempts = COALESCE($8, retry_max_attempts),
                retry_delay_seconds = COALESCE($9, retry_delay_seconds)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(webhook_id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&patch.url)
        .bind(patch.events.as_ref().map(|e| serde_json::json!(e)))
        .bind(patch.enabled)
        .bind(patch.retry_enabled)
        .bind(patch.retry_max_attempts)
        .bind(patch.retry_delay_seconds)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| WebhookError::NotFound(webhook_id.to_string()))?;

        tracing::info!(webhook = %webhook.name, "webhook updated");
        Ok(webhook)
    }

    pub async fn toggle_webhook(&self, webhook_id: &str) -> Result<Webhook, WebhookError> {
        let webhook = sqlx::query_as::<_, Webhook>(
            "UPDATE webhooks SET enabled = NOT enabled WHERE id = $1 RETURNING *",
        )
        .bind(webhook_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| WebhookError::NotFound(webhook_id.to_string()))?;

        tracing::info!(webhook = %webhook.name, enabled = webhook.enabled, "webhook toggled");
        Ok(webhook)
    }

    /// Hard delete. Log rows are purged in the same transaction so no
    /// orphaned statistics survive the subscription.
    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<(), WebhookError> {
        let mut tx = self.db_pool.begin().await?;

        sqlx::query("DELETE FROM webhook_logs WHERE webhook_id = $1")
            .bind(webhook_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(webhook_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(WebhookError::NotFound(webhook_id.to_string()));
        }

        tx.commit().await?;
        tracing::info!(webhook_id, "webhook deleted");
        Ok(())
    }

    /// Decrypt the stored signing secret for delivery-time use.
    pub fn delivery_secret(&self, webhook: &Webhook) -> Result<String, WebhookError> {
        Ok(encryption_service::decrypt_secret(
            &webhook.secret,
            &self.encryption_key,
        )?)
    }

    /// Persist one delivery attempt: exactly one log row plus atomic counter
    /// updates on the owning webhook, in a single transaction.
    pub async fn record_attempt(&self, record: AttemptRecord) -> Result<(), WebhookError> {
        let mut tx = self.db_pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO webhook_logs
                (id, webhook_id, event_type, event_timestamp, request_url,
                 request_headers, request_body, status_code, response_body,
                 response_time_ms, attempt, success, error_message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.webhook_id)
        .bind(&record.event_type)
        .bind(record.event_timestamp)
        .bind(&record.request_url)
        .bind(&record.request_headers)
        .bind(&record.request_body)
        .bind(record.status_code)
        .bind(&record.response_body)
        .bind(record.response_time_ms)
        .bind(record.attempt)
        .bind(record.success)
        .bind(&record.error_message)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE webhooks SET
                total_calls = total_calls + 1,
                failed_calls = failed_calls + $2,
                last_called_at = $3,
                last_error = $4
            WHERE id = $1
            "#,
        )
        .bind(&record.webhook_id)
        .bind(if record.success { 0i64 } else { 1i64 })
        .bind(Utc::now())
        .bind(if record.success {
            None
        } else {
            record.error_message.clone()
        })
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_webhook_logs(
        &self,
        webhook_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<WebhookLog>, i64), WebhookError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM webhook_logs WHERE webhook_id = $1",
        )
        .bind(webhook_id)
        .fetch_one(&self.db_pool)
        .await?;

        let logs = sqlx::query_as::<_, WebhookLog>(
            r#"
            SELECT * FROM webhook_logs
            WHERE webhook_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(webhook_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok((logs, total))
    }

    pub async fn get_recent_logs(
        &self,
        hours: i64,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<WebhookLog>, i64), WebhookError> {
        let cutoff = Utc::now() - Duration::hours(hours);

        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM webhook_logs WHERE created_at >= $1")
                .bind(cutoff)
                .fetch_one(&self.db_pool)
                .await?;

        let logs = sqlx::query_as::<_, WebhookLog>(
            r#"
            SELECT * FROM webhook_logs
            WHERE created_at >= $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(cutoff)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok((logs, total))
    }

    /// Delete log rows older than `days` days. Idempotent; returns the
    /// number of rows removed.
    pub async fn cleanup_old_logs(&self, days: i64) -> Result<u64, WebhookError> {
        let cutoff = Utc::now() - Duration::days(days);
        let result = sqlx::query("DELETE FROM webhook_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.db_pool)
            .await?;

        let deleted = result.rows_affected();
        tracing::info!(deleted, days, "webhook log cleanup finished");
        Ok(deleted)
    }

    pub async fn get_webhook_stats(&self, webhook_id: &str) -> Result<WebhookStats, WebhookError> {
        let webhook = self.get_webhook(webhook_id).await?;
        let cutoff = Utc::now() - Duration::hours(24);

        let recent_calls = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM webhook_logs WHERE webhook_id = $1 AND created_at >= $2",
        )
        .bind(webhook_id)
        .bind(cutoff)
        .fetch_one(&self.db_pool)
        .await?;

        let recent_failures = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM webhook_logs
            WHERE webhook_id = $1 AND created_at >= $2 AND success = FALSE
            "#,
        )
        .bind(webhook_id)
        .bind(cutoff)
        .fetch_one(&self.db_pool)
        .await?;

        let avg_response_time = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(response_time_ms)::float8 FROM webhook_logs
            WHERE webhook_id = $1 AND created_at >= $2 AND success = TRUE
            "#,
        )
        .bind(webhook_id)
        .bind(cutoff)
        .fetch_one(&self.db_pool)
        .await?
        .unwrap_or(0.0);

        Ok(WebhookStats {
            webhook_id: webhook.id.clone(),
            name: webhook.name.clone(),
            total_calls: webhook.total_calls,
            failed_calls: webhook.failed_calls,
            success_rate: success_rate(webhook.total_calls, webhook.failed_calls),
            last_called_at: webhook.last_called_at,
            last_error: webhook.last_error,
            recent_calls_24h: recent_calls,
            recent_failures_24h: recent_failures,
            avg_response_time_ms: (avg_response_time * 100.0).round() / 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate_basic() {
        assert_eq!(success_rate(10, 2), 80.0);
        assert_eq!(success_rate(4, 0), 100.0);
        assert_eq!(success_rate(3, 3), 0.0);
    }

    #[test]
    fn test_success_rate_no_calls_is_zero() {
        assert_eq!(success_rate(0, 0), 0.0);
    }
}
