//! Metadata store trait.

use async_trait::async_trait;

use super::errors::DbResult;
use super::models::{FileRecord, UsedPayment, UserRecord};
use crate::tiers::Tier;

/// Result of trying to record a payment signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This call recorded the signature.
    Claimed,
    /// The signature was already in the ledger.
    AlreadyClaimed,
}

/// Result of spending a credited payment on a paid action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RedeemOutcome {
    /// This call consumed the payment.
    Redeemed,
    /// The signature was never credited.
    Unknown,
    /// Another action already consumed the payment.
    AlreadyRedeemed,
    /// The credited amount is below what the action costs.
    Underpaid { amount: f64 },
}

/// Persistence for file rows, user rows and the used-payment ledger.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_file(&self, file: FileRecord) -> DbResult<FileRecord>;

    async fn get_file(&self, id: &str) -> DbResult<Option<FileRecord>>;

    async fn get_file_by_short_id(&self, short_id: &str) -> DbResult<Option<FileRecord>>;

    /// Files owned by `owner`, newest first.
    async fn list_files_by_owner(&self, owner: &str) -> DbResult<Vec<FileRecord>>;

    /// Public files, newest first, at most `limit`.
    async fn list_public_files(&self, limit: usize) -> DbResult<Vec<FileRecord>>;

    /// Returns false when no row matched.
    async fn set_file_visibility(&self, id: &str, is_public: bool) -> DbResult<bool>;

    async fn delete_file(&self, id: &str) -> DbResult<()>;

    async fn get_user(&self, wallet: &str) -> DbResult<Option<UserRecord>>;

    async fn get_or_create_user(&self, wallet: &str) -> DbResult<UserRecord>;

    async fn set_user_tier(&self, wallet: &str, tier: Tier) -> DbResult<()>;

    /// Add `delta` bytes to the wallet's usage, clamped at zero. Returns the
    /// new total. Missing users are left alone and report 0.
    async fn adjust_storage_used(&self, wallet: &str, delta: i64) -> DbResult<u64>;

    async fn is_payment_used(&self, signature: &str) -> DbResult<bool>;

    /// Atomically record a payment signature. Exactly one concurrent caller
    /// sees `Claimed` for a given signature.
    async fn claim_payment(&self, payment: UsedPayment) -> DbResult<ClaimOutcome>;

    /// Atomically mark a credited payment as consumed by `action`.
    ///
    /// Only an unredeemed entry whose amount is at least `min_amount` is
    /// redeemed. Exactly one concurrent caller sees `Redeemed` for a given
    /// signature.
    async fn redeem_payment(
        &self,
        signature: &str,
        min_amount: f64,
        action: &str,
    ) -> DbResult<RedeemOutcome>;

    /// Clear a redemption whose action failed before taking effect.
    async fn release_payment(&self, signature: &str) -> DbResult<()>;

    /// Most recent ledger entries, newest first.
    async fn recent_payments(&self, limit: usize) -> DbResult<Vec<UsedPayment>>;

    /// Persist any buffered state. Called on shutdown.
    async fn flush(&self) -> DbResult<()> {
        Ok(())
    }
}

/// Clamp-at-zero usage arithmetic shared by backends.
pub(crate) fn apply_delta(current: u64, delta: i64) -> u64 {
    if delta >= 0 {
        current.saturating_add(delta as u64)
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_delta_clamps() {
        assert_eq!(apply_delta(10, 5), 15);
        assert_eq!(apply_delta(10, -4), 6);
        assert_eq!(apply_delta(10, -40), 0);
        assert_eq!(apply_delta(u64::MAX, 1), u64::MAX);
        assert_eq!(apply_delta(0, i64::MIN), 0);
    }
}
