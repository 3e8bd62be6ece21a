//! Per-tab gate state machine.
//!
//! ```text
//! Disconnected -> Connected(Pending) -> Connected(Checked | Unknown)
//!   -> AwaitingSignature -> Authenticated -> Disconnected
//! ```
//!
//! Balance checks are issued as [`BalanceCheck`] tickets and run outside the
//! gate. A result is applied only if its ticket still matches the connected
//! wallet, so the last connected wallet always wins. Signing works the same
//! way through [`SignatureRequest`] tickets.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::balance::{is_sufficient, resolve_balance, AccountIndex, Balance, BalanceStatus};
use crate::error::{KawaiError, Result};
use crate::wallet::WalletAddress;

use super::signing::SignFn;
use super::store::SessionStore;
use super::token::{build_login_message, generate_nonce};
use super::{create_session, is_authenticated, logout, save_session};
use super::{AuthenticatedSession, SessionRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Disconnected,
    Connected {
        wallet: WalletAddress,
        balance: BalanceStatus,
    },
    AwaitingSignature {
        wallet: WalletAddress,
        balance: Balance,
        nonce: String,
        issued_at: DateTime<Utc>,
        message: String,
    },
    Authenticated {
        wallet: WalletAddress,
        expiry: DateTime<Utc>,
    },
}

impl GateState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected { .. } => "connected",
            Self::AwaitingSignature { .. } => "awaiting-signature",
            Self::Authenticated { .. } => "authenticated",
        }
    }
}

/// Ticket for one balance check, bound to the connection that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceCheck {
    pub wallet: WalletAddress,
    generation: u64,
}

impl BalanceCheck {
    /// Run the check against `index`.
    pub async fn run<I: AccountIndex + ?Sized>(self, index: &I, mint: &str) -> BalanceOutcome {
        let result = resolve_balance(index, &self.wallet, mint).await;
        BalanceOutcome {
            check: self,
            result,
        }
    }
}

/// Ticket for one signing round, bound to the wallet and message it was
/// issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRequest {
    pub wallet: WalletAddress,
    /// Login message the wallet is asked to sign.
    pub message: String,
    generation: u64,
}

/// A completed balance check, ready to hand back to the gate.
#[derive(Debug)]
pub struct BalanceOutcome {
    pub check: BalanceCheck,
    pub result: Result<Balance>,
}

pub struct SessionGate {
    store: Arc<dyn SessionStore>,
    role: SessionRole,
    threshold: Decimal,
    state: GateState,
    generation: u64,
    last_error: Option<String>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn SessionStore>, role: SessionRole, threshold: Decimal) -> Self {
        Self {
            store,
            role,
            threshold,
            state: GateState::Disconnected,
            generation: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Message of the most recent failure, cleared by the next transition
    /// that succeeds.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn connected_wallet(&self) -> Option<&WalletAddress> {
        match &self.state {
            GateState::Disconnected => None,
            GateState::Connected { wallet, .. }
            | GateState::AwaitingSignature { wallet, .. }
            | GateState::Authenticated { wallet, .. } => Some(wallet),
        }
    }

    /// Rebuild state from the store, as on a fresh page load.
    pub fn restore(&mut self, now: DateTime<Utc>) -> Result<Option<AuthenticatedSession>> {
        let session = is_authenticated(self.store.as_ref(), self.role, now)?;
        match &session {
            Some(s) => {
                self.state = GateState::Authenticated {
                    wallet: s.wallet.clone(),
                    expiry: s.expiry,
                };
            }
            None => {
                if matches!(self.state, GateState::Authenticated { .. }) {
                    self.state = GateState::Disconnected;
                }
            }
        }
        Ok(session)
    }

    /// A wallet reported itself connected. Any earlier balance or error is
    /// dropped and outstanding checks become stale.
    pub fn connect(&mut self, wallet: WalletAddress) -> BalanceCheck {
        self.generation += 1;
        self.last_error = None;
        info!(role = %self.role, wallet = %wallet.short(), "wallet connected");
        self.state = GateState::Connected {
            wallet: wallet.clone(),
            balance: BalanceStatus::Pending,
        };
        BalanceCheck {
            wallet,
            generation: self.generation,
        }
    }

    pub fn disconnect(&mut self) {
        self.generation += 1;
        self.last_error = None;
        self.state = GateState::Disconnected;
    }

    /// Apply a finished balance check. Returns `false` if it was stale.
    pub fn apply_balance(&mut self, outcome: BalanceOutcome) -> bool {
        let BalanceOutcome { check, result } = outcome;

        let fresh = check.generation == self.generation
            && matches!(&self.state, GateState::Connected { wallet, .. } if *wallet == check.wallet);
        if !fresh {
            warn!(wallet = %check.wallet.short(), "discarding stale balance result");
            return false;
        }

        match &result {
            Ok(balance) => info!(wallet = %check.wallet.short(), %balance, "balance checked"),
            Err(e) => {
                warn!(wallet = %check.wallet.short(), error = %e, "balance check failed");
                self.last_error = Some(e.to_string());
            }
        }
        self.state = GateState::Connected {
            wallet: check.wallet,
            balance: BalanceStatus::from_result(&result),
        };
        true
    }

    /// Start signing. Only allowed once the balance is known to be sufficient.
    /// Returns a ticket carrying the message the wallet must sign.
    pub fn begin_signature(&mut self, now: DateTime<Utc>) -> Result<SignatureRequest> {
        let (wallet, balance) = match &self.state {
            GateState::Connected {
                wallet,
                balance: BalanceStatus::Checked(balance),
            } => (wallet.clone(), *balance),
            GateState::Connected {
                balance: BalanceStatus::Pending,
                ..
            } => {
                return Err(KawaiError::InvalidState(
                    "balance check still pending".into(),
                ))
            }
            GateState::Connected {
                balance: BalanceStatus::Unknown(_),
                ..
            } => {
                return Err(KawaiError::InvalidState(
                    "balance unknown, retry the balance check".into(),
                ))
            }
            other => {
                return Err(KawaiError::InvalidState(format!(
                    "cannot sign while {}",
                    other.name()
                )))
            }
        };

        if !is_sufficient(balance, self.threshold) {
            return Err(KawaiError::InvalidState(format!(
                "insufficient balance: {balance} < {}",
                self.threshold
            )));
        }

        self.generation += 1;
        let nonce = generate_nonce();
        let message = build_login_message(&wallet, now, &nonce);
        self.state = GateState::AwaitingSignature {
            wallet: wallet.clone(),
            balance,
            nonce,
            issued_at: now,
            message: message.clone(),
        };
        Ok(SignatureRequest {
            wallet,
            message,
            generation: self.generation,
        })
    }

    /// Finish signing with the signer's answer to `request`.
    ///
    /// On success the session is stored and the gate is authenticated. On
    /// failure nothing is stored and the gate returns to its checked state.
    /// An answer to a request the gate has moved past is rejected and leaves
    /// the state untouched.
    pub fn finish_signature(
        &mut self,
        request: SignatureRequest,
        signature: Result<Vec<u8>>,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedSession> {
        let GateState::AwaitingSignature {
            wallet,
            balance,
            nonce,
            issued_at,
            message,
        } = self.state.clone()
        else {
            warn!(wallet = %request.wallet.short(), state = self.state.name(), "discarding signature, none pending");
            return Err(KawaiError::InvalidState(format!(
                "no signature pending while {}",
                self.state.name()
            )));
        };

        let current = request.generation == self.generation
            && request.wallet == wallet
            && request.message == message;
        if !current {
            warn!(wallet = %request.wallet.short(), "discarding stale signature");
            return Err(KawaiError::InvalidState(format!(
                "stale signature for {}",
                request.wallet.short()
            )));
        }

        let stored = signature.and_then(|sig| {
            let session = create_session(self.role, &wallet, issued_at, nonce, &sig, now)?;
            save_session(self.store.as_ref(), self.role, &session)?;
            Ok(session)
        });

        match stored {
            Ok(session) => {
                info!(role = %self.role, wallet = %wallet.short(), expiry = %session.expiry, "authenticated");
                self.last_error = None;
                self.state = GateState::Authenticated {
                    wallet: wallet.clone(),
                    expiry: session.expiry,
                };
                Ok(AuthenticatedSession {
                    role: self.role,
                    wallet,
                    expiry: session.expiry,
                })
            }
            Err(e) => {
                warn!(role = %self.role, error = %e, "signing failed");
                self.last_error = Some(e.to_string());
                self.state = GateState::Connected {
                    wallet,
                    balance: BalanceStatus::Checked(balance),
                };
                Err(e)
            }
        }
    }

    /// Sign with `sign_fn` and store the session in one step.
    pub async fn authenticate(
        &mut self,
        sign_fn: &SignFn,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedSession> {
        let request = self.begin_signature(now)?;
        let signature = sign_fn(request.message.as_bytes()).await;
        self.finish_signature(request, signature, now)
    }

    /// Clear the stored session and disconnect.
    pub fn logout(&mut self) -> Result<()> {
        logout(self.store.as_ref(), self.role)?;
        info!(role = %self.role, "logged out");
        self.generation += 1;
        self.last_error = None;
        self.state = GateState::Disconnected;
        Ok(())
    }
}
