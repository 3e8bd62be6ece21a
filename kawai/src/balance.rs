//! Balance resolver.
//!
//! Looks up the token accounts owned by a wallet through an [`AccountIndex`]
//! and reports the UI balance held of one mint. A failed lookup is always an
//! error, never a zero balance; callers fold it into
//! [`BalanceStatus::Unknown`].

use std::future::Future;
use std::pin::Pin;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{KawaiError, Result};
use crate::rpc::TOKEN_PROGRAM_ID;
use crate::wallet::WalletAddress;

/// UI balance of a token (raw amount scaled by its decimals).
pub type Balance = Decimal;

/// Largest scale a `Decimal` can carry.
const MAX_DECIMALS: u8 = 28;

/// Boxed future returned by [`AccountIndex`] queries.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One token account as reported by the account index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountRecord {
    pub mint: String,
    /// Raw integer amount in base units.
    pub amount: u64,
    pub decimals: u8,
    /// Pre-computed UI amount, when the index supplies one.
    pub ui_amount: Option<Decimal>,
}

impl TokenAccountRecord {
    /// UI balance of this record, preferring the index's own UI amount.
    ///
    /// # Errors
    ///
    /// Returns `KawaiError::MalformedResponse` if `decimals` exceeds the
    /// representable scale.
    pub fn ui_balance(&self) -> Result<Balance> {
        match self.ui_amount {
            Some(ui) => Ok(ui),
            None => raw_to_ui(self.amount, self.decimals),
        }
    }
}

/// Convert a raw amount to its UI value: `amount / 10^decimals`, exactly.
pub fn raw_to_ui(amount: u64, decimals: u8) -> Result<Balance> {
    if decimals > MAX_DECIMALS {
        return Err(KawaiError::MalformedResponse(format!(
            "token decimals {decimals} exceed maximum of {MAX_DECIMALS}"
        )));
    }
    Decimal::try_from_i128_with_scale(i128::from(amount), u32::from(decimals))
        .map(|d| d.normalize())
        .map_err(|e| KawaiError::MalformedResponse(format!("token amount {amount}: {e}")))
}

/// Read-only source of token account records for an owner.
pub trait AccountIndex: Send + Sync {
    /// All token accounts owned by `owner` under `program_id`.
    fn token_accounts_by_owner<'a>(
        &'a self,
        owner: &'a WalletAddress,
        program_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<TokenAccountRecord>>>;
}

/// Resolve the UI balance `wallet` holds of `target_mint`.
///
/// The first record whose mint matches wins. No matching record yields zero.
///
/// # Errors
///
/// Any failure of the index query is returned unchanged.
pub async fn resolve_balance<I: AccountIndex + ?Sized>(
    index: &I,
    wallet: &WalletAddress,
    target_mint: &str,
) -> Result<Balance> {
    let records = index
        .token_accounts_by_owner(wallet, TOKEN_PROGRAM_ID)
        .await?;
    debug!(wallet = %wallet.short(), accounts = records.len(), "token accounts fetched");

    match records.iter().find(|r| r.mint == target_mint) {
        Some(record) => record.ui_balance(),
        None => Ok(Decimal::ZERO),
    }
}

/// Whether `balance` meets `threshold` (inclusive).
pub fn is_sufficient(balance: Balance, threshold: Decimal) -> bool {
    balance >= threshold
}

/// Outcome of a balance check as seen by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceStatus {
    /// A check has been issued and has not completed.
    Pending,
    /// The check completed with this balance.
    Checked(Balance),
    /// The check failed; the balance is not known.
    Unknown(String),
}

impl BalanceStatus {
    pub fn from_result(result: &Result<Balance>) -> Self {
        match result {
            Ok(balance) => Self::Checked(*balance),
            Err(e) => Self::Unknown(e.to_string()),
        }
    }

    /// `Some(true/false)` once checked, `None` while pending or unknown.
    pub fn is_sufficient(&self, threshold: Decimal) -> Option<bool> {
        match self {
            Self::Checked(balance) => Some(is_sufficient(*balance, threshold)),
            Self::Pending | Self::Unknown(_) => None,
        }
    }

    pub fn balance(&self) -> Option<Balance> {
        match self {
            Self::Checked(balance) => Some(*balance),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MINT: &str = "CRonCzMtoLRHE6UsdpUCrm7nm7BwM3NfJU1ssVWAGBL7";
    const OTHER_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    /// Index returning a fixed set of records, or failing when `records` is `None`.
    struct FixedIndex {
        records: Option<Vec<TokenAccountRecord>>,
    }

    impl AccountIndex for FixedIndex {
        fn token_accounts_by_owner<'a>(
            &'a self,
            _owner: &'a WalletAddress,
            program_id: &'a str,
        ) -> BoxFuture<'a, Result<Vec<TokenAccountRecord>>> {
            assert_eq!(program_id, TOKEN_PROGRAM_ID);
            let out = match &self.records {
                Some(r) => Ok(r.clone()),
                None => Err(KawaiError::Http {
                    status: 503,
                    message: "unavailable".into(),
                }),
            };
            Box::pin(async move { out })
        }
    }

    fn record(mint: &str, amount: u64, decimals: u8) -> TokenAccountRecord {
        TokenAccountRecord {
            mint: mint.into(),
            amount,
            decimals,
            ui_amount: None,
        }
    }

    fn wallet() -> WalletAddress {
        WalletAddress::parse("11111111111111111111111111111111").unwrap()
    }

    #[test]
    fn test_raw_to_ui_nine_decimals() {
        assert_eq!(raw_to_ui(100_000_000_000, 9).unwrap(), dec!(100));
        assert_eq!(raw_to_ui(1, 9).unwrap(), dec!(0.000000001));
        assert_eq!(raw_to_ui(0, 9).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_raw_to_ui_max_u64_is_exact() {
        assert_eq!(
            raw_to_ui(u64::MAX, 0).unwrap(),
            Decimal::from(u64::MAX)
        );
    }

    #[test]
    fn test_raw_to_ui_rejects_excess_decimals() {
        let err = raw_to_ui(1, 29).unwrap_err();
        assert!(matches!(err, KawaiError::MalformedResponse(_)));
    }

    #[test]
    fn test_is_sufficient_boundary_inclusive() {
        assert!(!is_sufficient(dec!(99.999999), dec!(100)));
        assert!(is_sufficient(dec!(100), dec!(100)));
        assert!(is_sufficient(dec!(150), dec!(100)));
    }

    #[tokio::test]
    async fn test_no_matching_record_is_zero() {
        let index = FixedIndex {
            records: Some(vec![record(OTHER_MINT, 5_000_000, 6)]),
        };
        let balance = resolve_balance(&index, &wallet(), MINT).await.unwrap();
        assert_eq!(balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_empty_wallet_is_zero() {
        let index = FixedIndex { records: Some(vec![]) };
        assert_eq!(
            resolve_balance(&index, &wallet(), MINT).await.unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_matching_record_computed_from_raw() {
        let index = FixedIndex {
            records: Some(vec![
                record(OTHER_MINT, 1, 6),
                record(MINT, 100_000_000_000, 9),
            ]),
        };
        let balance = resolve_balance(&index, &wallet(), MINT).await.unwrap();
        assert_eq!(balance, dec!(100));
    }

    #[tokio::test]
    async fn test_first_matching_record_wins() {
        let index = FixedIndex {
            records: Some(vec![
                record(MINT, 5_000_000_000, 9),
                record(MINT, 500_000_000_000, 9),
            ]),
        };
        let balance = resolve_balance(&index, &wallet(), MINT).await.unwrap();
        assert_eq!(balance, dec!(5));
    }

    #[tokio::test]
    async fn test_ui_amount_preferred() {
        let mut rec = record(MINT, 100_000_000_000, 9);
        rec.ui_amount = Some(dec!(100.5));
        let index = FixedIndex {
            records: Some(vec![rec]),
        };
        let balance = resolve_balance(&index, &wallet(), MINT).await.unwrap();
        assert_eq!(balance, dec!(100.5));
    }

    #[tokio::test]
    async fn test_query_failure_is_error_not_zero() {
        let index = FixedIndex { records: None };
        let result = resolve_balance(&index, &wallet(), MINT).await;
        assert!(result.is_err());

        let status = BalanceStatus::from_result(&result);
        assert!(matches!(status, BalanceStatus::Unknown(_)));
        assert_eq!(status.is_sufficient(dec!(100)), None);
        assert_eq!(status.balance(), None);
    }

    #[test]
    fn test_balance_status_sufficiency() {
        assert_eq!(BalanceStatus::Pending.is_sufficient(dec!(100)), None);
        assert_eq!(
            BalanceStatus::Checked(dec!(0)).is_sufficient(dec!(100)),
            Some(false)
        );
        assert_eq!(
            BalanceStatus::Checked(dec!(100)).is_sufficient(dec!(100)),
            Some(true)
        );
    }
}
