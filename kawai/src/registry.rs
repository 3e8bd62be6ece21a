//! Client for the address registry behind the provider dashboard.
//!
//! Endpoints:
//! - `GET /address-exists?address=` -> `{"exists": bool}`
//! - `POST /register` `{address, password}` + `X-Kawai-Session` attestation
//! - `POST /login` `{address, password}`
//!
//! Both POST endpoints answer `{"success": bool, "message": string}`.

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{KawaiError, Result};
use crate::attestation::Attestation;
use crate::wallet::WalletAddress;

/// Header carrying the sealed attestation on registration.
pub const SESSION_HEADER: &str = "X-Kawai-Session";

#[derive(Debug, Deserialize)]
struct AddressExists {
    exists: bool,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    address: &'a str,
    password: &'a str,
}

/// Reply to `/register` and `/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryReply {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Which branch [`RegistryClient::sign_in`] took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderAuth {
    Registered(RegistryReply),
    LoggedIn(RegistryReply),
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET /address-exists - whether the address is already registered.
    pub async fn address_exists(&self, address: &WalletAddress) -> Result<bool> {
        let url = format!("{}/address-exists", self.base_url);
        debug!(address = %address.short(), "registry lookup");
        let resp = self
            .client
            .get(&url)
            .query(&[("address", address.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(KawaiError::Http {
                status,
                message: body,
            });
        }

        let body = resp.text().await?;
        let parsed: AddressExists = serde_json::from_str(&body)
            .map_err(|e| KawaiError::MalformedResponse(format!("address-exists: {e}")))?;
        Ok(parsed.exists)
    }

    /// POST /register - register the address, attested by a sealed blockhash.
    pub async fn register(
        &self,
        address: &WalletAddress,
        password: &str,
        attestation: &Attestation,
    ) -> Result<RegistryReply> {
        let url = format!("{}/register", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header(SESSION_HEADER, attestation.as_str())
            .json(&Credentials {
                address: address.as_str(),
                password,
            })
            .send()
            .await?;
        read_reply(resp, "registration failed").await
    }

    /// POST /login - password login for a registered address.
    pub async fn login(&self, address: &WalletAddress, password: &str) -> Result<RegistryReply> {
        let url = format!("{}/login", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&Credentials {
                address: address.as_str(),
                password,
            })
            .send()
            .await?;
        read_reply(resp, "login failed").await
    }

    /// Register the address if unknown, otherwise log in.
    pub async fn sign_in(
        &self,
        address: &WalletAddress,
        password: &str,
        attestation: &Attestation,
    ) -> Result<ProviderAuth> {
        if self.address_exists(address).await? {
            let reply = self.login(address, password).await?;
            info!(address = %address.short(), "provider logged in");
            Ok(ProviderAuth::LoggedIn(reply))
        } else {
            let reply = self.register(address, password, attestation).await?;
            info!(address = %address.short(), "provider registered");
            Ok(ProviderAuth::Registered(reply))
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

async fn read_reply(resp: Response, fallback: &str) -> Result<RegistryReply> {
    let status = resp.status();
    let body = resp.text().await?;
    let parsed = serde_json::from_str::<RegistryReply>(&body);

    if !status.is_success() {
        let message = match parsed {
            Ok(reply) if !reply.message.is_empty() => reply.message,
            _ => fallback.to_string(),
        };
        return Err(KawaiError::Registry {
            status: status.as_u16(),
            message,
        });
    }

    let reply = parsed.map_err(|e| KawaiError::MalformedResponse(format!("registry reply: {e}")))?;
    if !reply.success {
        let message = if reply.message.is_empty() {
            fallback.to_string()
        } else {
            reply.message
        };
        return Err(KawaiError::Registry {
            status: status.as_u16(),
            message,
        });
    }
    Ok(reply)
}
