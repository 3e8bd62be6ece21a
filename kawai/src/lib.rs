pub mod attestation;
pub mod balance;
pub mod config;
pub mod error;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod stats;
pub mod wallet;

// ---- Top-level re-exports for ergonomic usage ----

// Config + errors
pub use config::KawaiConfig;
pub use error::{KawaiError, Result};

// Balance resolver
pub use balance::{
    is_sufficient, resolve_balance, AccountIndex, Balance, BalanceStatus, TokenAccountRecord,
};
pub use rpc::SolanaRpcClient;

// Session gate
pub use session::gate::{BalanceCheck, BalanceOutcome, GateState, SessionGate, SignatureRequest};
pub use session::signing::{keypair_sign_fn, SignFn, SignFuture};
pub use session::store::{FileStore, MemoryStore, SessionStore};
pub use session::token::{build_login_message, SessionClaims, SessionToken};
pub use session::{authenticate, is_authenticated, logout};
pub use session::{AuthenticatedSession, SessionRole, StoredSession};

// Address registry
pub use attestation::{encrypt_attestation, Attestation};
pub use registry::{ProviderAuth, RegistryClient, RegistryReply};

// Stats
pub use stats::GpuHours;

// Wallet
pub use wallet::WalletAddress;
