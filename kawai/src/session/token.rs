use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{KawaiError, Result};
use crate::wallet::WalletAddress;

use super::SessionRole;

/// Bytes of randomness in a login nonce.
pub const NONCE_BYTES: usize = 16;

/// Contents of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub wallet: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    pub nonce: String,
    /// bs58-encoded signature over the login message.
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<SessionRole>,
}

/// Opaque pseudo-session token: base64 of the JSON-encoded [`SessionClaims`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn encode(claims: &SessionClaims) -> Result<Self> {
        let json = serde_json::to_vec(claims)?;
        Ok(Self(STANDARD.encode(json)))
    }

    /// Wrap a token read back from storage without inspecting it.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn decode(&self) -> Result<SessionClaims> {
        let bytes = STANDARD
            .decode(self.0.trim())
            .map_err(|e| KawaiError::SessionInvalid(format!("base64: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| KawaiError::SessionInvalid(format!("claims: {e}")))
    }

    /// Wallet named in the token, for display only.
    pub fn wallet(&self) -> Result<WalletAddress> {
        let claims = self.decode()?;
        WalletAddress::parse(&claims.wallet)
            .map_err(|e| KawaiError::SessionInvalid(format!("wallet: {e}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The human-readable message a wallet signs to start a session.
pub fn build_login_message(address: &WalletAddress, now: DateTime<Utc>, nonce: &str) -> String {
    format!(
        "Sign in to KAWAI\n\nWallet: {address}\nTimestamp: {}\nNonce: {nonce}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// A fresh random nonce, hex-encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
