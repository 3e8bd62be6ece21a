pub mod types;

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::balance::{AccountIndex, BoxFuture, TokenAccountRecord};
use crate::error::{KawaiError, Result};
use crate::wallet::WalletAddress;

use types::{KeyedAccount, RpcContextual, RpcRequest, RpcResponse};

/// SPL Token program id.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Commitment used for balance reads.
pub const COMMITMENT: &str = "confirmed";

/// Minimal Solana JSON-RPC client.
#[derive(Debug)]
pub struct SolanaRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl SolanaRpcClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Invoke a JSON-RPC method and decode its `result`.
    ///
    /// # Errors
    ///
    /// - `KawaiError::Http` on a non-2xx status.
    /// - `KawaiError::Rpc` when the node answers with an error object.
    /// - `KawaiError::MalformedResponse` when the envelope or result does not
    ///   match the expected shape.
    pub async fn call<P, T>(&self, method: &str, params: P) -> Result<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc request");

        let resp = self
            .client
            .post(&self.url)
            .json(&RpcRequest::new(id, method, params))
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
        let envelope: RpcResponse<serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| KawaiError::MalformedResponse(format!("{method}: invalid envelope: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(KawaiError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = envelope
            .result
            .ok_or_else(|| KawaiError::MalformedResponse(format!("{method}: missing result")))?;
        serde_json::from_value(result)
            .map_err(|e| KawaiError::MalformedResponse(format!("{method}: {e}")))
    }

    /// `getParsedTokenAccountsByOwner` filtered by token program.
    pub async fn get_parsed_token_accounts_by_owner(
        &self,
        owner: &WalletAddress,
        program_id: &str,
    ) -> Result<Vec<TokenAccountRecord>> {
        let params = serde_json::json!([
            owner.as_str(),
            { "programId": program_id },
            { "encoding": "jsonParsed", "commitment": COMMITMENT },
        ]);

        let resp: RpcContextual<Vec<KeyedAccount>> = self
            .call("getParsedTokenAccountsByOwner", params)
            .await?;
        debug!(slot = resp.context.slot, accounts = resp.value.len(), "token accounts");

        resp.value
            .into_iter()
            .map(TokenAccountRecord::try_from)
            .collect()
    }

    /// Get the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl AccountIndex for SolanaRpcClient {
    fn token_accounts_by_owner<'a>(
        &'a self,
        owner: &'a WalletAddress,
        program_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<TokenAccountRecord>>> {
        Box::pin(self.get_parsed_token_accounts_by_owner(owner, program_id))
    }
}
