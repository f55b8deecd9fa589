//! Solana integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment variable (mint authority secret)
//!     → wallet.rs (key loading, signing)
//!     → client.rs (JSON-RPC with timeouts and failover)
//!     → transaction.rs (compile, sign, broadcast, confirm)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod pubkey;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::SolanaClient;
pub use pubkey::{programs, Pubkey};
pub use transaction::{AccountMeta, Instruction, Transaction, TxSubmitter};
pub use types::{BlockchainError, BlockchainResult};
pub use wallet::Keypair;
