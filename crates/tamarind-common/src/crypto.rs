//! Secret encryption
//!
//! AES-256-GCM authenticated encryption for secret values. The stored
//! representation is `base64(nonce || ciphertext || tag)` where the nonce is
//! 12 random bytes drawn fresh for every call to [`Encryptor::encrypt`].

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Result, TamarindError};

/// Required key length in bytes
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Symmetric encryptor holding a single 256-bit process key
///
/// The key is immutable once constructed and the cipher is safe to share
/// across tasks behind an `Arc`.
pub struct Encryptor {
    cipher: Aes256Gcm,
    key_id: String,
}

impl Encryptor {
    /// Create an encryptor from raw key bytes
    ///
    /// Fails with `Configuration` unless the key is exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(TamarindError::Configuration(format!(
                "encryption key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| TamarindError::Configuration("invalid encryption key".to_string()))?;

        Ok(Self {
            cipher,
            key_id: fingerprint(key),
        })
    }

    /// Create an encryptor from a base64-encoded key
    pub fn from_base64_key(key: &str) -> Result<Self> {
        let key_bytes = BASE64.decode(key.trim()).map_err(|e| {
            TamarindError::Configuration(format!("encryption key is not valid base64: {}", e))
        })?;

        Self::new(&key_bytes)
    }

    /// Generate a new random 256-bit key
    pub fn generate_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut key);
        key
    }

    /// Generate a new random key and return it base64-encoded
    pub fn generate_base64_key() -> String {
        BASE64.encode(Self::generate_key())
    }

    /// Short fingerprint of the key, recorded on every secret it encrypts
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Encrypt a plaintext value
    ///
    /// Empty plaintext is rejected with `Validation`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Err(TamarindError::validation("plaintext must not be empty"));
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| TamarindError::internal("encryption failed"))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt a value produced by [`Encryptor::encrypt`]
    ///
    /// Every failure (bad encoding, truncation, authentication, non UTF-8
    /// payload) is reported as `Integrity`.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let combined = BASE64
            .decode(ciphertext)
            .map_err(|_| TamarindError::Integrity)?;

        if combined.len() < NONCE_LEN {
            return Err(TamarindError::Integrity);
        }

        let (nonce_bytes, sealed) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| TamarindError::Integrity)?;

        String::from_utf8(plaintext).map_err(|_| TamarindError::Integrity)
    }
}

impl fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryptor")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

fn fingerprint(key: &[u8]) -> String {
    let digest = Sha256::digest(key);
    const_hex::encode(&digest[..8])
}
