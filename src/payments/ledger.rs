//! Gate for actions that require an already-credited payment.
//!
//! A credited payment is spent by exactly one paid action. Redemption is an
//! atomic conditional update in the store, so two actions presenting the
//! same signature cannot both pass.

use crate::blockchain::types::{lamports_to_sol, sol_to_lamports};
use crate::db::{RecordStore, RedeemOutcome};

use super::types::{PaymentError, PaymentResult};

/// Something a payment can be spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidAction {
    Mint,
    OnchainUpload,
}

impl PaidAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaidAction::Mint => "mint",
            PaidAction::OnchainUpload => "onchain_upload",
        }
    }
}

/// Smallest credited amount accepted for a `fee_sol` price, rounded down
/// to whole lamports.
pub fn minimum_payment(fee_sol: f64, tolerance: f64) -> f64 {
    let lamports = (sol_to_lamports(fee_sol) as f64 * tolerance).floor();
    lamports_to_sol(lamports as i128)
}

/// Spend the payment behind `signature` on `action`.
///
/// Returns the redeemed signature so a failed action can release it.
pub async fn redeem_payment(
    store: &dyn RecordStore,
    signature: Option<&str>,
    fee_sol: f64,
    tolerance: f64,
    action: PaidAction,
) -> PaymentResult<String> {
    let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(PaymentError::NotVerified);
    };
    let required = minimum_payment(fee_sol, tolerance);

    match store
        .redeem_payment(signature, required, action.as_str())
        .await?
    {
        RedeemOutcome::Redeemed => {
            tracing::info!(signature = %signature, action = action.as_str(), "Payment redeemed");
            Ok(signature.to_string())
        }
        RedeemOutcome::Unknown => {
            tracing::info!(signature = %signature, "Signature not in payment ledger");
            Err(PaymentError::NotVerified)
        }
        RedeemOutcome::AlreadyRedeemed => {
            tracing::warn!(signature = %signature, action = action.as_str(), "Payment replayed");
            Err(PaymentError::AlreadyRedeemed)
        }
        RedeemOutcome::Underpaid { amount } => {
            tracing::warn!(signature = %signature, paid = amount, required, "Payment below fee");
            Err(PaymentError::Underpaid {
                paid: amount,
                required: fee_sol,
            })
        }
    }
}

/// Give a redeemed payment back after its action failed.
pub async fn release_payment(store: &dyn RecordStore, signature: &str) {
    match store.release_payment(signature).await {
        Ok(()) => tracing::info!(signature = %signature, "Payment released"),
        Err(e) => tracing::error!(signature = %signature, error = %e, "Failed to release payment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, UsedPayment};

    #[test]
    fn test_minimum_payment_rounds_down_to_lamports() {
        assert_eq!(minimum_payment(0.01, 0.99), 0.0099);
        assert_eq!(minimum_payment(0.01, 1.0), 0.01);
        assert_eq!(minimum_payment(0.0, 0.99), 0.0);
    }

    #[tokio::test]
    async fn test_redeem_payment() {
        let store = MemoryStore::new(None);
        store.claim_payment(UsedPayment::new("paid", 0.01)).await.unwrap();

        assert_eq!(
            redeem_payment(&store, Some(" paid "), 0.01, 0.99, PaidAction::Mint)
                .await
                .unwrap(),
            "paid"
        );
        assert!(matches!(
            redeem_payment(&store, Some("paid"), 0.01, 0.99, PaidAction::OnchainUpload).await,
            Err(PaymentError::AlreadyRedeemed)
        ));
        assert!(matches!(
            redeem_payment(&store, Some("unpaid"), 0.01, 0.99, PaidAction::Mint).await,
            Err(PaymentError::NotVerified)
        ));
        assert!(matches!(
            redeem_payment(&store, Some(""), 0.01, 0.99, PaidAction::Mint).await,
            Err(PaymentError::NotVerified)
        ));
        assert!(matches!(
            redeem_payment(&store, None, 0.01, 0.99, PaidAction::Mint).await,
            Err(PaymentError::NotVerified)
        ));
    }

    #[tokio::test]
    async fn test_dust_payment_is_underpaid() {
        let store = MemoryStore::new(None);
        store.claim_payment(UsedPayment::new("dust", 0.000000001)).await.unwrap();

        let err = redeem_payment(&store, Some("dust"), 0.01, 0.99, PaidAction::Mint)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Underpaid { .. }));
        assert!(err.is_payment_required());
    }

    #[tokio::test]
    async fn test_release_allows_retry() {
        let store = MemoryStore::new(None);
        store.claim_payment(UsedPayment::new("paid", 0.01)).await.unwrap();

        let sig = redeem_payment(&store, Some("paid"), 0.01, 0.99, PaidAction::OnchainUpload)
            .await
            .unwrap();
        release_payment(&store, &sig).await;
        assert!(redeem_payment(&store, Some("paid"), 0.01, 0.99, PaidAction::OnchainUpload)
            .await
            .is_ok());
    }
}
