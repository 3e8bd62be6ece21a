//! JSON-RPC 2.0 envelopes and the `jsonParsed` token account shape.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::balance::TokenAccountRecord;
use crate::error::{KawaiError, Result};

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P> RpcRequest<'a, P> {
    pub fn new(id: u64, method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// `{"context": {...}, "value": ...}` wrapper used by most Solana methods.
#[derive(Debug, Deserialize)]
pub struct RpcContextual<T> {
    pub context: RpcContext,
    pub value: T,
}

#[derive(Debug, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedAccount {
    pub pubkey: String,
    pub account: ParsedAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedAccount {
    pub data: ParsedAccountData,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub lamports: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedAccountData {
    pub program: String,
    pub parsed: ParsedTokenAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTokenAccount {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub info: TokenAccountInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountInfo {
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    /// Raw amount as a decimal string.
    pub amount: String,
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount: Option<f64>,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

impl UiTokenAmount {
    /// The UI amount reported by the node, exact string form first.
    fn reported_ui_amount(&self) -> Result<Option<Decimal>> {
        if let Some(s) = self.ui_amount_string.as_deref() {
            let value = Decimal::from_str(s)
                .map_err(|e| KawaiError::MalformedResponse(format!("uiAmountString {s:?}: {e}")))?;
            return non_negative(value).map(Some);
        }
        match self.ui_amount {
            Some(f) => {
                let value = Decimal::try_from(f)
                    .map_err(|e| KawaiError::MalformedResponse(format!("uiAmount {f}: {e}")))?;
                non_negative(value).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn non_negative(value: Decimal) -> Result<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(KawaiError::MalformedResponse(format!(
            "negative token amount {value}"
        )));
    }
    Ok(value)
}

impl TryFrom<KeyedAccount> for TokenAccountRecord {
    type Error = KawaiError;

    fn try_from(keyed: KeyedAccount) -> Result<Self> {
        let info = keyed.account.data.parsed.info;
        let amount = info.token_amount.amount.parse::<u64>().map_err(|e| {
            KawaiError::MalformedResponse(format!(
                "account {}: amount {:?}: {e}",
                keyed.pubkey, info.token_amount.amount
            ))
        })?;
        let ui_amount = info.token_amount.reported_ui_amount()?;

        Ok(Self {
            mint: info.mint,
            amount,
            decimals: info.token_amount.decimals,
            ui_amount,
        })
    }
}
