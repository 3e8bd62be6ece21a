use std::path::PathBuf;

use rust_decimal::Decimal;
use url::Url;

use crate::error::{KawaiError, Result};

/// Mint address of the KAWAI token.
pub const KAWAI_MINT: &str = "CRonCzMtoLRHE6UsdpUCrm7nm7BwM3NfJU1ssVWAGBL7";
/// Decimals of the KAWAI mint. The account index reports decimals per record,
/// which always takes precedence.
pub const KAWAI_DECIMALS: u8 = 9;
/// Minimum UI balance required to unlock a dashboard.
pub const MINIMUM_TOKENS_REQUIRED: u64 = 100;

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_AUTH_URL: &str = "https://auth.getkawai.com";
pub const DEFAULT_SESSION_FILE: &str = ".kawai-session.json";

pub const RPC_URL_ENV: &str = "KAWAI_RPC_URL";
pub const AUTH_URL_ENV: &str = "KAWAI_AUTH_URL";
pub const SESSION_FILE_ENV: &str = "KAWAI_SESSION_FILE";
pub const ATTESTATION_SECRET_ENV: &str = "KAWAI_ATTESTATION_SECRET";
pub const ATTESTATION_BLOCKHASH_ENV: &str = "KAWAI_ATTESTATION_BLOCKHASH";

/// Development fallbacks for the registration attestation.
pub const DEV_ATTESTATION_SECRET: &str = "dev-secret";
pub const DEV_ATTESTATION_BLOCKHASH: &str = "dev-blockhash";

/// Where to acquire KAWAI when the balance falls short, as `(venue, url)`.
pub const ACQUISITION_LINKS: &[(&str, &str)] = &[
    (
        "Raydium",
        "https://raydium.io/swap/?inputCurrency=sol&outputCurrency=CRonCzMtoLRHE6UsdpUCrm7nm7BwM3NfJU1ssVWAGBL7",
    ),
    (
        "Orca",
        "https://www.orca.so/pools/5x6DLbiMMpioqpyFcCixxD7EY9EabyypjA7Uc7xNvvRk",
    ),
];

/// Configuration for the token gate.
#[derive(Debug, Clone)]
pub struct KawaiConfig {
    /// Solana JSON-RPC endpoint used as the account index.
    pub rpc_url: String,
    /// Base URL of the address registry service.
    pub auth_url: String,
    /// Mint of the gated token.
    pub mint: String,
    /// Minimum UI balance (inclusive).
    pub threshold: Decimal,
    /// File backing the local session store.
    pub session_file: PathBuf,
    /// Shared secret the registration attestation key is derived from.
    pub attestation_secret: String,
    /// Value sealed into the registration attestation.
    pub attestation_blockhash: String,
}

impl Default for KawaiConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            auth_url: DEFAULT_AUTH_URL.into(),
            mint: KAWAI_MINT.into(),
            threshold: Decimal::from(MINIMUM_TOKENS_REQUIRED),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            attestation_secret: DEV_ATTESTATION_SECRET.into(),
            attestation_blockhash: DEV_ATTESTATION_BLOCKHASH.into(),
        }
    }
}

impl KawaiConfig {
    /// Build a config from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `KawaiError::Validation` if either endpoint override is not an
    /// absolute http(s) URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup(RPC_URL_ENV)) {
            config.rpc_url = validate_url(RPC_URL_ENV, &url)?;
        }
        if let Some(url) = non_empty(lookup(AUTH_URL_ENV)) {
            config.auth_url = validate_url(AUTH_URL_ENV, &url)?;
        }
        if let Some(path) = non_empty(lookup(SESSION_FILE_ENV)) {
            config.session_file = PathBuf::from(path);
        }
        if let Some(secret) = non_empty(lookup(ATTESTATION_SECRET_ENV)) {
            config.attestation_secret = secret;
        }
        if let Some(blockhash) = non_empty(lookup(ATTESTATION_BLOCKHASH_ENV)) {
            config.attestation_blockhash = blockhash;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_url(name: &str, value: &str) -> Result<String> {
    let url = Url::parse(value)
        .map_err(|e| KawaiError::Validation(format!("{name}: invalid URL {value:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(value.trim_end_matches('/').to_string()),
        other => Err(KawaiError::Validation(format!(
            "{name}: unsupported scheme {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = KawaiConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.mint, KAWAI_MINT);
        assert_eq!(config.threshold, Decimal::from(100));
        assert_eq!(config.session_file, PathBuf::from(DEFAULT_SESSION_FILE));
        assert_eq!(config.attestation_secret, "dev-secret");
        assert_eq!(config.attestation_blockhash, "dev-blockhash");
    }

    #[test]
    fn test_attestation_overrides() {
        let config = KawaiConfig::from_lookup(lookup_from(&[
            (ATTESTATION_SECRET_ENV, "prod-secret"),
            (ATTESTATION_BLOCKHASH_ENV, "4sGjMW1sUnHzSxGspuhpqLDx6wiyjNtZAMdL4VZHirAn"),
        ]))
        .unwrap();
        assert_eq!(config.attestation_secret, "prod-secret");
        assert_eq!(
            config.attestation_blockhash,
            "4sGjMW1sUnHzSxGspuhpqLDx6wiyjNtZAMdL4VZHirAn"
        );
    }

    #[test]
    fn test_overrides_applied_and_trailing_slash_trimmed() {
        let config = KawaiConfig::from_lookup(lookup_from(&[
            (RPC_URL_ENV, "http://127.0.0.1:8899/"),
            (AUTH_URL_ENV, "https://auth.example.com"),
            (SESSION_FILE_ENV, "/tmp/kawai.json"),
        ]))
        .unwrap();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.auth_url, "https://auth.example.com");
        assert_eq!(config.session_file, PathBuf::from("/tmp/kawai.json"));
    }

    #[test]
    fn test_blank_override_ignored() {
        let config = KawaiConfig::from_lookup(lookup_from(&[(RPC_URL_ENV, "   ")])).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = KawaiConfig::from_lookup(lookup_from(&[(RPC_URL_ENV, "not a url")]))
            .unwrap_err();
        assert!(matches!(err, KawaiError::Validation(_)));

        let err = KawaiConfig::from_lookup(lookup_from(&[(AUTH_URL_ENV, "ftp://auth.example")]))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }
}
