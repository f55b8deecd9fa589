//! Token-gated storage tiers.
//!
//! A wallet's tier is a pure function of its balance of the configured
//! token. The balance itself comes from the chain on every listing, so a
//! wallet that sells its tokens drops back to `free` on its next visit.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blockchain::{Pubkey, SolanaClient};
use crate::config::{TierConfig, TierLimits};

/// A named quota level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Holder,
    Whale,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Holder => "holder",
            Tier::Whale => "whale",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a token balance to a tier. Thresholds are inclusive lower bounds.
pub fn tier_for_balance(balance: f64, config: &TierConfig) -> Tier {
    if balance >= config.whale_min {
        Tier::Whale
    } else if balance >= config.holder_min {
        Tier::Holder
    } else {
        Tier::Free
    }
}

pub fn limits_for(tier: Tier, config: &TierConfig) -> TierLimits {
    match tier {
        Tier::Free => config.free,
        Tier::Holder => config.holder,
        Tier::Whale => config.whale,
    }
}

/// Look up the wallet's gating-token balance.
///
/// Lookup failures degrade to a zero balance so a flaky RPC never blocks
/// uploads, it only withholds the larger quota.
pub async fn fetch_token_balance(client: &SolanaClient, wallet: &str, config: &TierConfig) -> f64 {
    if config.token_mint.is_empty() {
        return 0.0;
    }
    let (owner, mint) = match (wallet.parse::<Pubkey>(), config.token_mint.parse::<Pubkey>()) {
        (Ok(owner), Ok(mint)) => (owner, mint),
        _ => {
            tracing::debug!(wallet = %wallet, "Wallet is not a valid address; treating balance as 0");
            return 0.0;
        }
    };
    match client.get_token_balance(&owner, &mint).await {
        Ok(balance) => balance,
        Err(e) => {
            tracing::warn!(wallet = %wallet, error = %e, "Error fetching token balance");
            0.0
        }
    }
}

/// Balance lookup and tier mapping in one step.
pub async fn resolve_tier(client: &SolanaClient, wallet: &str, config: &TierConfig) -> Tier {
    let balance = fetch_token_balance(client, wallet, config).await;
    tier_for_balance(balance, config)
}
