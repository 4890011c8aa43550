//! Integration tests for the outbound wire contract: envelope shape,
//! canonical serialization, and HMAC-SHA256 signature verification as a
//! receiver would perform it.

use serde_json::json;

use atlas_backend::webhooks::events::{invalid_events, is_valid_event, WEBHOOK_EVENTS};
use atlas_backend::webhooks::signing::{
    canonical_json, generate_secret, sign_payload, verify_signature,
};

/// A receiver recomputing the HMAC over the raw body bytes must accept a
/// correctly signed envelope.
#[test]
fn test_receiver_can_verify_over_body_bytes() {
    let secret = generate_secret();
    let envelope = json!({
        "event": "user.created",
        "timestamp": "2025-11-12T10:30:00+00:00",
        "source": "system",
        "payload": {"username": "alice", "quota_bytes": 1073741824u64},
    });

    let signature = sign_payload(&envelope, &secret);
    let body = canonical_json(&envelope);

    // Receiver side: parse the body it received and verify.
    let received: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(verify_signature(&received, &signature, &secret));
}

#[test]
fn test_signature_binds_secret_and_content() {
    let envelope = json!({"event": "backup.created", "payload": {}});
    let signature = sign_payload(&envelope, "secret-a");

    assert!(!verify_signature(&envelope, &signature, "secret-b"));

    let altered = json!({"event": "backup.deleted", "payload": {}});
    assert!(!verify_signature(&altered, &signature, "secret-a"));
}

/// Canonical form is independent of the key order the sender happened to
/// build the envelope with.
#[test]
fn test_canonical_form_key_order_independent() {
    let a = json!({"event": "test", "payload": {"b": 1, "a": 2}, "source": "system"});
    let b = json!({"source": "system", "payload": {"a": 2, "b": 1}, "event": "test"});
    assert_eq!(canonical_json(&a), canonical_json(&b));
    assert_eq!(sign_payload(&a, "s"), sign_payload(&b, "s"));
}

#[test]
fn test_every_vocabulary_entry_is_subscribable() {
    let names: Vec<String> = WEBHOOK_EVENTS
        .iter()
        .map(|e| e.event_type.to_string())
        .collect();
    assert!(invalid_events(&names).is_empty());
    assert_eq!(names.len(), 21);
}

#[test]
fn test_vocabulary_rejects_foreign_entries() {
    assert!(!is_valid_event("service.restarted"));
    let events = vec!["user.created".to_string(), "cert.revoked".to_string()];
    assert_eq!(invalid_events(&events), vec!["cert.revoked"]);
}
