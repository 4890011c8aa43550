//! At-rest encryption for webhook signing secrets.
//!
//! Secrets are encrypted with AES-256-GCM before hitting the database and
//! only decrypted at delivery time. Stored format: hex(nonce || ciphertext).

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

const NONCE_SIZE: usize = 12;

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),
    #[error("Ciphertext malformed: {0}")]
    MalformedCiphertext(String),
    #[error("Cipher operation failed")]
    CipherFailure,
}

fn load_key(key_hex: &str) -> Result<Aes256Gcm, EncryptionError> {
    let key_bytes =
        hex::decode(key_hex).map_err(|e| EncryptionError::InvalidKey(e.to_string()))?;
    if key_bytes.len() != 32 {
        return Err(EncryptionError::InvalidKey(format!(
            "expected 32 bytes, got {}",
            key_bytes.len()
        )));
    }
    Ok(Aes256Gcm::new(key_bytes.as_slice().into()))
}

pub fn encrypt_secret(plaintext: &str, key_hex: &str) -> Result<String, EncryptionError> {
    let cipher = load_key(key_hex)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| EncryptionError::CipherFailure)?;

    let mut sealed = nonce.to_vec();
    sealed.extend_from_slice(&ciphertext);
    Ok(hex::encode(sealed))
}

pub fn decrypt_secret(sealed_hex: &str, key_hex: &str) -> Result<String, EncryptionError> {
    let cipher = load_key(key_hex)?;
    let sealed =
        hex::decode(sealed_hex).map_err(|e| EncryptionError::MalformedCiphertext(e.to_string()))?;
    if sealed.len() < NONCE_SIZE {
        return Err(EncryptionError::MalformedCiphertext(
            "too short to contain a nonce".to_string(),
        ));
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| EncryptionError::CipherFailure)?;

    String::from_utf8(plaintext).map_err(|e| EncryptionError::MalformedCiphertext(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let secret = "a1b2c3d4e5f60718293a4b5c6d7e8f90";
        let sealed = encrypt_secret(secret, KEY).unwrap();
        assert_ne!(sealed, secret);
        assert_eq!(decrypt_secret(&sealed, KEY).unwrap(), secret);
    }

    #[test]
    fn test_nonce_makes_ciphertexts_differ() {
        let sealed1 = encrypt_secret("same", KEY).unwrap();
        let sealed2 = encrypt_secret("same", KEY).unwrap();
        assert_ne!(sealed1, sealed2);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let other = "f0e0d0c0b0a090807060504030201000f0e0d0c0b0a090807060504030201000";
        let sealed = encrypt_secret("secret", KEY).unwrap();
        assert!(decrypt_secret(&sealed, other).is_err());
    }

    #[test]
    fn test_key_must_be_256_bit() {
        assert!(encrypt_secret("x", "abcd").is_err());
        assert!(decrypt_secret("abcd", "not-hex").is_err());
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let short = hex::encode([0u8; 4]);
        assert!(decrypt_secret(&short, KEY).is_err());
    }
}
