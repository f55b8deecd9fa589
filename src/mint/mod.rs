//! NFT minting for uploaded files.
//!
//! A mint is three transactions, each confirmed before the next:
//! 1. create and initialize the mint account
//! 2. attach token metadata pointing at a stored JSON document
//! 3. create the recipient's token account, mint one token, drop the mint authority

pub mod instructions;
pub mod metadata;
pub mod minter;

use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::storage::StorageError;

pub use metadata::MintRequest;
pub use minter::{parse_recipient, MintOutcome, NftMinter};

#[derive(Debug, Error)]
pub enum MintError {
    #[error("Recipient wallet address required")]
    MissingRecipient,

    #[error("Invalid wallet address")]
    InvalidRecipient,

    #[error("Metadata URI is {0} bytes, limit is 200")]
    UriTooLong(usize),

    #[error("Failed to encode metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Failed to store metadata: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    /// Failed after a transaction was sent, so part of the mint may be on chain.
    #[error("Mint incomplete: {0}")]
    Incomplete(Box<MintError>),
}

impl MintError {
    pub(crate) fn after_broadcast(self) -> Self {
        match self {
            MintError::Incomplete(_) => self,
            other => MintError::Incomplete(Box::new(other)),
        }
    }

    /// True when nothing reached the chain, so a redeemed payment can be
    /// handed back.
    pub fn is_before_broadcast(&self) -> bool {
        !matches!(self, MintError::Incomplete(_))
    }
}

pub type MintResult<T> = Result<T, MintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_broadcast_wraps_once() {
        let err = MintError::Blockchain(BlockchainError::Timeout(10)).after_broadcast();
        assert!(!err.is_before_broadcast());
        let again = err.after_broadcast();
        assert!(matches!(again, MintError::Incomplete(ref inner) if matches!(**inner, MintError::Blockchain(_))));
        assert!(MintError::UriTooLong(300).is_before_broadcast());
    }
}
