//! Keypair management and message signing.
//!
//! # Security
//! - The mint authority secret is loaded ONLY from an environment variable
//! - Secrets are never logged or serialized

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use crate::blockchain::pubkey::Pubkey;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable holding the mint authority secret key.
pub const MINT_PRIVATE_KEY_ENV_VAR: &str = "COINFILE_MINT_PRIVATE_KEY";

/// An ed25519 keypair able to sign transaction messages.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// A fresh random keypair (used for new mint accounts).
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Parse a 64-byte secret key (secret || public).
    ///
    /// Accepts base58, the usual wallet export format, or the JSON byte
    /// array written by `solana-keygen`.
    pub fn from_secret_str(secret: &str) -> BlockchainResult<Self> {
        let secret = secret.trim();
        let bytes = if secret.starts_with('[') {
            serde_json::from_str::<Vec<u8>>(secret)
                .map_err(|e| BlockchainError::Wallet(format!("Invalid key array: {}", e)))?
        } else {
            bs58::decode(secret)
                .into_vec()
                .map_err(|e| BlockchainError::Wallet(format!("Invalid base58 key: {}", e)))?
        };
        Self::from_keypair_bytes(&bytes)
    }

    pub fn from_keypair_bytes(bytes: &[u8]) -> BlockchainResult<Self> {
        if bytes.len() != 64 {
            return Err(BlockchainError::Wallet(format!(
                "Expected 64 key bytes, got {}",
                bytes.len()
            )));
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes[..32]);
        let signing_key = SigningKey::from_bytes(&secret);

        if signing_key.verifying_key().as_bytes() != &bytes[32..] {
            return Err(BlockchainError::Wallet(
                "Public half does not match secret".to_string(),
            ));
        }
        Ok(Self { signing_key })
    }

    /// Load the mint authority from `COINFILE_MINT_PRIVATE_KEY`.
    pub fn from_env() -> BlockchainResult<Self> {
        let secret = std::env::var(MINT_PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                MINT_PRIVATE_KEY_ENV_VAR
            ))
        })?;
        let keypair = Self::from_secret_str(&secret)?;
        tracing::info!(address = %keypair.pubkey(), "Mint authority loaded");
        Ok(keypair)
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Secret followed by public key, as wallets export it.
    pub fn to_keypair_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
