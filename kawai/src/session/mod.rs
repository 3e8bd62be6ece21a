//! Pseudo-session gate.
//!
//! A session is a signed login message packaged into a base64 token and kept
//! in a [`SessionStore`] next to its expiry. Nothing here verifies the
//! signature; validity is purely `now < expiry`.

pub mod gate;
pub mod signing;
pub mod store;
pub mod token;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{KawaiError, Result};
use crate::wallet::WalletAddress;

use signing::SignFn;
use store::SessionStore;
use token::{build_login_message, generate_nonce, SessionClaims, SessionToken};

/// Session lifetime in hours.
pub const SESSION_TTL_HOURS: i64 = 24;

pub fn session_ttl() -> Duration {
    Duration::hours(SESSION_TTL_HOURS)
}

/// Dashboard a session unlocks. Each role has its own storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    Agent,
    Provider,
}

impl SessionRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Provider => "provider",
        }
    }

    pub fn token_key(self) -> &'static str {
        match self {
            Self::Agent => "agent_sessionToken",
            Self::Provider => "provider_sessionToken",
        }
    }

    pub fn expiry_key(self) -> &'static str {
        match self {
            Self::Agent => "agent_sessionExpiry",
            Self::Provider => "provider_sessionExpiry",
        }
    }
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionRole {
    type Err = KawaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Self::Agent),
            "provider" => Ok(Self::Provider),
            other => Err(KawaiError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// A token together with what it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: SessionToken,
    pub claims: SessionClaims,
    pub expiry: DateTime<Utc>,
}

/// A live session reconstructed from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub role: SessionRole,
    /// Decoded from the token for display only.
    pub wallet: WalletAddress,
    pub expiry: DateTime<Utc>,
}

/// Package a signature into a session expiring `SESSION_TTL_HOURS` after `now`.
pub fn create_session(
    role: SessionRole,
    wallet: &WalletAddress,
    signed_at: DateTime<Utc>,
    nonce: String,
    signature: &[u8],
    now: DateTime<Utc>,
) -> Result<StoredSession> {
    let claims = SessionClaims {
        wallet: wallet.to_string(),
        timestamp: signed_at.timestamp_millis(),
        nonce,
        signature: bs58::encode(signature).into_string(),
        role: Some(role),
    };
    let token = SessionToken::encode(&claims)?;

    Ok(StoredSession {
        token,
        claims,
        expiry: now + session_ttl(),
    })
}

/// Persist token and expiry (epoch milliseconds) under the role's keys.
pub fn save_session(store: &dyn SessionStore, role: SessionRole, session: &StoredSession) -> Result<()> {
    store.set(role.token_key(), session.token.as_str())?;
    if let Err(e) = store.set(role.expiry_key(), &session.expiry.timestamp_millis().to_string()) {
        // A token without an expiry must not linger.
        if let Err(cleanup) = store.remove(role.token_key()) {
            warn!(role = %role, error = %cleanup, "failed to remove token after expiry write failed");
        }
        return Err(e);
    }
    Ok(())
}

/// Sign a fresh login message for `wallet` and store the resulting session.
///
/// Nothing is stored when the signer fails.
pub async fn authenticate(
    store: &dyn SessionStore,
    role: SessionRole,
    wallet: &WalletAddress,
    sign_fn: &SignFn,
    now: DateTime<Utc>,
) -> Result<StoredSession> {
    let nonce = generate_nonce();
    let message = build_login_message(wallet, now, &nonce);

    let signature = sign_fn(message.as_bytes()).await?;

    let session = create_session(role, wallet, now, nonce, &signature, now)?;
    save_session(store, role, &session)?;
    info!(role = %role, wallet = %wallet.short(), expiry = %session.expiry, "session stored");
    Ok(session)
}

/// Reconstruct the session for `role` at `now`.
///
/// Expired, incomplete, or undecodable sessions are purged and reported as
/// `None`.
pub fn is_authenticated(
    store: &dyn SessionStore,
    role: SessionRole,
    now: DateTime<Utc>,
) -> Result<Option<AuthenticatedSession>> {
    let token = store.get(role.token_key())?;
    let expiry = store.get(role.expiry_key())?;

    let (token, expiry) = match (token, expiry) {
        (Some(token), Some(expiry)) => (token, expiry),
        (None, None) => return Ok(None),
        _ => {
            warn!(role = %role, "incomplete session, purging");
            logout(store, role)?;
            return Ok(None);
        }
    };

    let Some(expiry) = parse_expiry(&expiry) else {
        warn!(role = %role, expiry = %expiry, "unreadable session expiry, purging");
        logout(store, role)?;
        return Ok(None);
    };

    if now >= expiry {
        info!(role = %role, %expiry, "session expired");
        logout(store, role)?;
        return Ok(None);
    }

    match SessionToken::from_stored(token).wallet() {
        Ok(wallet) => Ok(Some(AuthenticatedSession {
            role,
            wallet,
            expiry,
        })),
        Err(e) => {
            warn!(role = %role, error = %e, "undecodable session token, purging");
            logout(store, role)?;
            Ok(None)
        }
    }
}

/// Clear the stored token and expiry for `role`.
pub fn logout(store: &dyn SessionStore, role: SessionRole) -> Result<()> {
    store.remove(role.token_key())?;
    store.remove(role.expiry_key())
}

fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}
