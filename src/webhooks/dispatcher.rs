//! Event dispatch and delivery execution.
//!
//! `send_event` fans an event out to every enabled subscription whose event
//! set contains it; each subscriber gets its own spawned task so a slow or
//! failing endpoint never blocks the others, and the triggering caller never
//! waits on delivery. Every attempt writes one log row and bumps the
//! subscription counters; failed attempts are retried after the
//! subscription's configured delay, re-checking that the webhook still
//! exists and is enabled before each retry fires.

use std::time::Instant;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::db::models::Webhook;
use crate::db::services::webhook_service::{AttemptRecord, WebhookError, WebhookService};
use crate::webhooks::events::TEST_EVENT;
use crate::webhooks::signing;

/// Outbound request timeout per delivery attempt.
const DELIVERY_TIMEOUT_SECS: u64 = 10;

/// Response bodies are captured truncated to this many characters.
const RESPONSE_CAPTURE_LIMIT: usize = 1000;

const USER_AGENT: &str = "ATLAS-Webhook/1.0";

/// Classification of one finished delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Succeeded,
    FailedRetryable,
    FailedTerminal,
}

/// HTTP status < 400 succeeds; anything else (including transport faults,
/// passed as `None`) fails, retryable while the policy allows another
/// attempt.
pub fn classify_outcome(
    status_code: Option<u16>,
    retry_enabled: bool,
    attempt: i32,
    max_attempts: i32,
) -> DeliveryOutcome {
    match status_code {
        Some(code) if code < 400 => DeliveryOutcome::Succeeded,
        _ => {
            if retry_enabled && attempt < max_attempts {
                DeliveryOutcome::FailedRetryable
            } else {
                DeliveryOutcome::FailedTerminal
            }
        }
    }
}

/// Result of a single attempt, returned to `test_webhook` callers.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub response_time_ms: i32,
    pub error_message: Option<String>,
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    webhook_service: WebhookService,
    http_client: Client,
}

impl WebhookDispatcher {
    pub fn new(webhook_service: WebhookService) -> Result<Self, WebhookError> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WebhookError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            webhook_service,
            http_client,
        })
    }

    /// Notify all matching subscribers of an event. Fire-and-forget: each
    /// delivery runs in its own task and outcomes are recorded as data, not
    /// surfaced to the caller. Returns the number of deliveries spawned.
    pub async fn send_event(&self, event_type: &str, payload: Value, source: &str) -> usize {
        let subscribers = match self.webhook_service.subscribers_for(event_type).await {
            Ok(subs) => subs,
            Err(e) => {
                tracing::error!(event_type, error = %e, "failed to load webhook subscribers");
                return 0;
            }
        };

        let count = subscribers.len();
        for webhook in subscribers {
            let dispatcher = self.clone();
            let event_type = event_type.to_string();
            let payload = payload.clone();
            let source = source.to_string();
            tokio::spawn(async move {
                dispatcher
                    .deliver_with_retries(webhook, &event_type, &payload, &source)
                    .await;
            });
        }

        if count > 0 {
            tracing::info!(event_type, subscribers = count, "event dispatched");
        }
        count
    }

    /// Run the delivery state machine for one subscriber: attempt, and while
    /// the outcome is retryable sleep out the configured delay, re-fetch the
    /// webhook and go again with the attempt ordinal incremented.
    async fn deliver_with_retries(
        &self,
        mut webhook: Webhook,
        event_type: &str,
        payload: &Value,
        source: &str,
    ) {
        let mut attempt = 1;
        loop {
            let result = self
                .attempt_delivery(&webhook, event_type, payload, source, attempt)
                .await;

            let outcome = classify_outcome(
                result.status_code,
                webhook.retry_enabled,
                attempt,
                webhook.retry_max_attempts,
            );
            match outcome {
                DeliveryOutcome::Succeeded | DeliveryOutcome::FailedTerminal => return,
                DeliveryOutcome::FailedRetryable => {
                    tracing::warn!(
                        webhook = %webhook.name,
                        attempt,
                        delay_seconds = webhook.retry_delay_seconds,
                        "delivery failed, retry scheduled"
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(
                        webhook.retry_delay_seconds.max(0) as u64,
                    ))
                    .await;

                    // The webhook may have been deleted or disabled while we
                    // slept; the retry must not fire in that case.
                    match self.webhook_service.get_webhook(&webhook.id).await {
                        Ok(current) if current.enabled => webhook = current,
                        Ok(_) => {
                            tracing::info!(webhook = %webhook.name, "retry abandoned, webhook disabled");
                            return;
                        }
                        Err(_) => {
                            tracing::info!(webhook_id = %webhook.id, "retry abandoned, webhook gone");
                            return;
                        }
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// One delivery attempt: build and sign a fresh envelope, POST it with a
    /// bounded timeout, then persist exactly one log row plus the counter
    /// updates.
    async fn attempt_delivery(
        &self,
        webhook: &Webhook,
        event_type: &str,
        payload: &Value,
        source: &str,
        attempt: i32,
    ) -> AttemptResult {
        let event_timestamp = Utc::now();
        let envelope = serde_json::json!({
            "event": event_type,
            "timestamp": event_timestamp.to_rfc3339(),
            "source": source,
            "payload": payload,
        });

        let secret = match self.webhook_service.delivery_secret(webhook) {
            Ok(secret) => secret,
            Err(e) => {
                let result = AttemptResult {
                    success: false,
                    status_code: None,
                    response_time_ms: 0,
                    error_message: Some(format!("secret unavailable: {e}")),
                };
                self.record(webhook, event_type, event_timestamp, &envelope, None, attempt, &result)
                    .await;
                return result;
            }
        };

        let signature = signing::sign_payload(&envelope, &secret);
        // The signed canonical bytes are exactly what goes on the wire, so
        // receivers can verify over the raw request body.
        let body = signing::canonical_json(&envelope);

        let request_headers = serde_json::json!({
            "Content-Type": "application/json",
            "X-ATLAS-Event": event_type,
            "X-ATLAS-Signature": signature,
            "User-Agent": USER_AGENT,
        });

        let start = Instant::now();
        let response = self
            .http_client
            .post(&webhook.url)
            .header("Content-Type", "application/json")
            .header("X-ATLAS-Event", event_type)
            .header("X-ATLAS-Signature", signature)
            .body(body)
            .send()
            .await;
        let response_time_ms = start.elapsed().as_millis() as i32;

        let (result, response_body) = match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let success = status < 400;
                let body: String = response
                    .text()
                    .await
                    .unwrap_or_default()
                    .chars()
                    .take(RESPONSE_CAPTURE_LIMIT)
                    .collect();
                let result = AttemptResult {
                    success,
                    status_code: Some(status),
                    response_time_ms,
                    error_message: if success {
                        None
                    } else {
                        Some(format!("HTTP {status}"))
                    },
                };
                (result, Some(body))
            }
            Err(e) => {
                let error_message = if e.is_timeout() {
                    format!("request timed out after {DELIVERY_TIMEOUT_SECS}s")
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    format!("request error: {e}")
                };
                let result = AttemptResult {
                    success: false,
                    status_code: None,
                    response_time_ms,
                    error_message: Some(error_message),
                };
                (result, None)
            }
        };

        self.record(
            webhook,
            event_type,
            event_timestamp,
            &envelope,
            Some((&request_headers, response_body)),
            attempt,
            &result,
        )
        .await;

        if result.success {
            tracing::info!(
                webhook = %webhook.name,
                event_type,
                attempt,
                response_time_ms,
                "webhook delivered"
            );
        } else {
            tracing::error!(
                webhook = %webhook.name,
                event_type,
                attempt,
                error = result.error_message.as_deref().unwrap_or("unknown"),
                "webhook delivery failed"
            );
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        webhook: &Webhook,
        event_type: &str,
        event_timestamp: chrono::DateTime<Utc>,
        envelope: &Value,
        request_and_response: Option<(&Value, Option<String>)>,
        attempt: i32,
        result: &AttemptResult,
    ) {
        let (request_headers, response_body) = match request_and_response {
            Some((headers, body)) => (Some(headers.clone()), body),
            None => (None, None),
        };
        let record = AttemptRecord {
            webhook_id: webhook.id.clone(),
            event_type: event_type.to_string(),
            event_timestamp,
            request_url: webhook.url.clone(),
            request_headers,
            request_body: Some(envelope.clone()),
            status_code: result.status_code.map(i32::from),
            response_body,
            response_time_ms: Some(result.response_time_ms),
            attempt,
            success: result.success,
            error_message: result.error_message.clone(),
        };

        if let Err(e) = self.webhook_service.record_attempt(record).await {
            tracing::error!(webhook = %webhook.name, error = %e, "failed to record delivery attempt");
        }
    }

    /// Manual connectivity check: a single attempt with a fixed payload,
    /// never retried. Unlike `send_event`, the outcome is returned to the
    /// caller.
    pub async fn test_webhook(&self, webhook_id: &str) -> Result<AttemptResult, WebhookError> {
        let webhook = self.webhook_service.get_webhook(webhook_id).await?;
        let payload = serde_json::json!({
            "message": "ATLAS webhook connectivity test",
            "webhook_id": webhook.id,
        });
        Ok(self
            .attempt_delivery(&webhook, TEST_EVENT, &payload, "manual_test", 1)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_200_succeeds() {
        assert_eq!(
            classify_outcome(Some(200), true, 1, 3),
            DeliveryOutcome::Succeeded
        );
        assert_eq!(
            classify_outcome(Some(302), false, 3, 3),
            DeliveryOutcome::Succeeded
        );
    }

    #[test]
    fn test_http_500_without_retry_is_terminal() {
        assert_eq!(
            classify_outcome(Some(500), false, 1, 3),
            DeliveryOutcome::FailedTerminal
        );
    }

    #[test]
    fn test_http_500_with_retry_budget_is_retryable() {
        assert_eq!(
            classify_outcome(Some(500), true, 1, 3),
            DeliveryOutcome::FailedRetryable
        );
        assert_eq!(
            classify_outcome(Some(500), true, 2, 3),
            DeliveryOutcome::FailedRetryable
        );
    }

    #[test]
    fn test_final_attempt_is_terminal() {
        assert_eq!(
            classify_outcome(Some(500), true, 3, 3),
            DeliveryOutcome::FailedTerminal
        );
    }

    #[test]
    fn test_transport_fault_follows_retry_rule() {
        assert_eq!(
            classify_outcome(None, true, 1, 3),
            DeliveryOutcome::FailedRetryable
        );
        assert_eq!(
            classify_outcome(None, false, 1, 3),
            DeliveryOutcome::FailedTerminal
        );
        assert_eq!(
            classify_outcome(None, true, 3, 3),
            DeliveryOutcome::FailedTerminal
        );
    }

    #[test]
    fn test_4xx_is_a_failure() {
        assert_eq!(
            classify_outcome(Some(404), true, 1, 3),
            DeliveryOutcome::FailedRetryable
        );
        assert_eq!(
            classify_outcome(Some(400), false, 1, 3),
            DeliveryOutcome::FailedTerminal
        );
    }
}
