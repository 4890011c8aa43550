//! Envelope signing for outbound webhook deliveries.
//!
//! Signatures are hex-encoded HMAC-SHA256 over the canonical JSON
//! serialization of the envelope, keyed by the subscription secret.
//! Receivers recompute the HMAC over the request body to verify origin.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Serialize a JSON value with object keys in lexicographic order at every
/// nesting level, so both sides of the wire derive identical bytes.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Compute the hex HMAC-SHA256 signature of an envelope.
pub fn sign_payload(payload: &Value, secret: &str) -> String {
    let message = canonical_json(payload);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a signature using constant-time comparison.
pub fn verify_signature(payload: &Value, signature_hex: &str, secret: &str) -> bool {
    let expected = sign_payload(payload, secret);
    expected.as_bytes().ct_eq(signature_hex.as_bytes()).into()
}

/// Generate a fresh 256-bit signing secret, hex-encoded.
pub fn generate_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_keys_recursively() {
        let value = json!({"b": 1, "a": {"z": true, "m": [3, {"y": 2, "x": 1}]}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"m":[3,{"x":1,"y":2}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn test_canonical_json_is_stable_across_insertion_order() {
        let a = json!({"event": "test", "timestamp": "t", "source": "s"});
        let b = json!({"source": "s", "event": "test", "timestamp": "t"});
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let payload = json!({"event": "user.created", "payload": {"username": "alice"}});
        assert_eq!(sign_payload(&payload, "secret"), sign_payload(&payload, "secret"));
    }

    #[test]
    fn test_signature_is_hex_sha256() {
        let sig = sign_payload(&json!({"event": "test"}), "secret");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_roundtrip() {
        let payload = json!({"event": "user.created", "payload": {"username": "alice"}});
        let sig = sign_payload(&payload, "secret");
        assert!(verify_signature(&payload, &sig, "secret"));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let payload = json!({"event": "user.created"});
        let sig = sign_payload(&payload, "secret");
        assert!(!verify_signature(&payload, &sig, "other-secret"));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let payload = json!({"event": "user.created"});
        let sig = sign_payload(&payload, "secret");
        let tampered = json!({"event": "user.deleted"});
        assert!(!verify_signature(&tampered, &sig, "secret"));
    }

    #[test]
    fn test_generated_secret_is_256_bit_hex() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, generate_secret());
    }
}
