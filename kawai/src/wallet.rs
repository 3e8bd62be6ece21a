use std::fmt;
use std::str::FromStr;

pub use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::error::{KawaiError, Result};

/// A base58-encoded Solana account address.
///
/// Treated as an opaque value once parsed; the only check is that it decodes
/// to 32 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse a wallet address from its base58 text.
    ///
    /// # Errors
    ///
    /// Returns `KawaiError::Validation` if the text is empty, not base58, or
    /// does not decode to 32 bytes.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(KawaiError::Validation("empty wallet address".into()));
        }

        let bytes = bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| KawaiError::Validation(format!("invalid wallet address {trimmed:?}: {e}")))?;
        if bytes.len() != 32 {
            return Err(KawaiError::Validation(format!(
                "invalid wallet address {trimmed:?}: expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Address of an ed25519 public key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(bs58::encode(key.as_bytes()).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines (`AbCd..WxYz`).
    pub fn short(&self) -> String {
        let s = &self.0;
        if s.len() <= 10 {
            return s.clone();
        }
        format!("{}..{}", &s[..4], &s[s.len() - 4..])
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = KawaiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = KawaiError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// Parse a private key from a bs58 string.
///
/// Accepts either a 32-byte secret or a 64-byte keypair (secret followed by
/// public key, the Solana CLI layout).
pub fn keypair_from_private_key(key: &str) -> Result<SigningKey> {
    let bytes = bs58::decode(key.trim())
        .into_vec()
        .map_err(|e| KawaiError::Signing(format!("bs58 decode error: {e}")))?;

    let secret_bytes: [u8; 32] = match bytes.len() {
        64 | 32 => bytes[..32]
            .try_into()
            .map_err(|_| KawaiError::Signing("invalid key length".into()))?,
        n => {
            return Err(KawaiError::Signing(format!("unexpected key length: {n}")));
        }
    };

    Ok(SigningKey::from_bytes(&secret_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn test_parse_accepts_32_byte_address() {
        let addr = WalletAddress::parse("CRonCzMtoLRHE6UsdpUCrm7nm7BwM3NfJU1ssVWAGBL7").unwrap();
        assert_eq!(addr.as_str(), "CRonCzMtoLRHE6UsdpUCrm7nm7BwM3NfJU1ssVWAGBL7");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let addr = WalletAddress::parse("  11111111111111111111111111111111\n").unwrap();
        assert_eq!(addr.to_string(), "11111111111111111111111111111111");
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!(WalletAddress::parse("").is_err());
        assert!(WalletAddress::parse("0OIl").is_err());
        // Valid base58 but only a few bytes long.
        assert!(WalletAddress::parse("abc").is_err());
    }

    #[test]
    fn test_from_verifying_key_round_trips_through_parse() {
        let addr = WalletAddress::from_verifying_key(&test_key().verifying_key());
        let parsed: WalletAddress = addr.as_str().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_short_form() {
        let addr = WalletAddress::parse("CRonCzMtoLRHE6UsdpUCrm7nm7BwM3NfJU1ssVWAGBL7").unwrap();
        assert_eq!(addr.short(), "CRon..GBL7");
    }

    #[test]
    fn test_serde_is_plain_string() {
        let addr = WalletAddress::from_verifying_key(&test_key().verifying_key());
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: WalletAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<WalletAddress>("\"nope\"").is_err());
    }

    #[test]
    fn test_keypair_from_secret_and_full_keypair() {
        let key = test_key();
        let secret = bs58::encode(key.to_bytes()).into_string();
        assert_eq!(keypair_from_private_key(&secret).unwrap().to_bytes(), key.to_bytes());

        let mut full = key.to_bytes().to_vec();
        full.extend_from_slice(key.verifying_key().as_bytes());
        let full = bs58::encode(full).into_string();
        assert_eq!(keypair_from_private_key(&full).unwrap().to_bytes(), key.to_bytes());
    }

    #[test]
    fn test_keypair_rejects_bad_length() {
        let short = bs58::encode([1u8; 16]).into_string();
        let err = keypair_from_private_key(&short).unwrap_err();
        assert!(err.to_string().contains("unexpected key length: 16"));
    }
}
