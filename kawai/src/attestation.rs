//! Registration attestation for the address registry.
//!
//! The `X-Kawai-Session` header carries `base64(iv || ciphertext)`, where the
//! ciphertext is the configured blockhash sealed with AES-256-GCM under a key
//! derived from the shared secret (PBKDF2-HMAC-SHA256, fixed salt).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{KawaiError, Result};

pub const KEY_SALT: &[u8] = b"kawaii-salt";
pub const PBKDF2_ROUNDS: u32 = 100_000;
pub const IV_BYTES: usize = 12;

/// Sealed blockhash, ready to send as a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation(String);

impl Attestation {
    pub fn from_header(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 256-bit AES key for `secret`.
pub fn derive_key(secret: &str) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), KEY_SALT, PBKDF2_ROUNDS, &mut key);
    key
}

/// Seal `blockhash` under `secret` with a random IV.
pub fn encrypt_attestation(secret: &str, blockhash: &str) -> Result<Attestation> {
    let mut iv = [0u8; IV_BYTES];
    OsRng.fill_bytes(&mut iv);
    seal(&derive_key(secret), &iv, blockhash)
}

fn seal(key: &[u8; 32], iv: &[u8; IV_BYTES], blockhash: &str) -> Result<Attestation> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(iv), blockhash.as_bytes())
        .map_err(|_| KawaiError::Attestation("encryption failed".into()))?;

    let mut blob = Vec::with_capacity(IV_BYTES + ciphertext.len());
    blob.extend_from_slice(iv);
    blob.extend_from_slice(&ciphertext);
    Ok(Attestation(STANDARD.encode(blob)))
}

/// Open an attestation sealed under `secret`, returning the blockhash.
///
/// # Errors
///
/// Returns `KawaiError::Attestation` on bad base64, a blob shorter than the
/// IV, a wrong secret or tampered ciphertext.
pub fn decrypt_attestation(secret: &str, attestation: &Attestation) -> Result<String> {
    let blob = STANDARD
        .decode(attestation.as_str())
        .map_err(|e| KawaiError::Attestation(format!("invalid base64: {e}")))?;
    if blob.len() < IV_BYTES {
        return Err(KawaiError::Attestation("attestation too short".into()));
    }
    let (iv, ciphertext) = blob.split_at(IV_BYTES);

    let key = derive_key(secret);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| KawaiError::Attestation("decryption failed".into()))?;
    String::from_utf8(plaintext)
        .map_err(|e| KawaiError::Attestation(format!("blockhash not UTF-8: {e}")))
}
