//! Row types shared by every backend.
//!
//! Field names match the hosted table columns, so rows round-trip through
//! PostgREST without renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tiers::Tier;

/// Owner marker for uploads without a wallet.
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// Where a file's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Supabase,
    Local,
    /// Paid on-chain storage tier.
    Solana,
}

impl StorageProvider {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "supabase" => StorageProvider::Supabase,
            "solana" => StorageProvider::Solana,
            _ => StorageProvider::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub short_id: String,
    pub owner_wallet: String,
    pub original_filename: String,
    pub size_bytes: u64,
    pub storage_provider: StorageProvider,
    /// Object key inside the bucket.
    pub storage_path: String,
    pub url: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tx_signature: Option<String>,
}

impl FileRecord {
    pub fn is_owned_by(&self, wallet: &str) -> bool {
        self.owner_wallet != ANONYMOUS_OWNER && self.owner_wallet == wallet
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub wallet_address: String,
    pub total_storage_used: u64,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(wallet_address: &str) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            total_storage_used: 0,
            tier: Tier::Free,
            created_at: Utc::now(),
        }
    }
}

/// Ledger entry for a transaction credited by a payment check.
///
/// A credited payment unlocks one paid action; `redeemed_at` is set when
/// that action consumes it and never cleared afterwards, except by a
/// release when the action itself failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedPayment {
    pub tx_signature: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Action that consumed the payment, e.g. `mint` or `onchain_upload`.
    #[serde(default)]
    pub redeemed_for: Option<String>,
}

impl UsedPayment {
    /// A freshly credited, unredeemed payment.
    pub fn new(tx_signature: &str, amount: f64) -> Self {
        Self {
            tx_signature: tx_signature.to_string(),
            amount,
            created_at: Utc::now(),
            redeemed_at: None,
            redeemed_for: None,
        }
    }

    pub fn is_redeemed(&self) -> bool {
        self.redeemed_at.is_some()
    }
}
