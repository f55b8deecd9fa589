//! Matches recent transactions to the payment wallet against a payment check.

use chrono::Utc;
use std::sync::Arc;

use crate::blockchain::types::{lamports_to_sol, sol_to_lamports, ParsedTransaction};
use crate::blockchain::{Pubkey, SolanaClient};
use crate::config::PaymentConfig;
use crate::db::{ClaimOutcome, RecordStore, UsedPayment};
use crate::observability::metrics;

use super::types::{PaymentCheckRequest, PaymentError, PaymentMatch, PaymentResult};

/// What a transaction has to show to count as the payment.
#[derive(Debug, Clone)]
pub struct PaymentCriteria<'a> {
    pub receiver: &'a str,
    pub expected_lamports: u64,
    pub tolerance: f64,
    pub sender: Option<&'a str>,
    pub payment_id: Option<&'a str>,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Failed,
    NoBlockTime,
    OutsideWindow,
    ReceiverMissing,
    Underpaid,
    SenderMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Match { received_lamports: i128, has_memo: bool },
    Skip(SkipReason),
}

/// Decide whether `tx` satisfies `criteria` at unix time `now`.
pub fn evaluate_transaction(tx: &ParsedTransaction, criteria: &PaymentCriteria<'_>, now: i64) -> Evaluation {
    if tx.is_failed() {
        return Evaluation::Skip(SkipReason::Failed);
    }
    let Some(block_time) = tx.block_time else {
        return Evaluation::Skip(SkipReason::NoBlockTime);
    };
    if now.saturating_sub(block_time) > criteria.window_secs as i64 {
        return Evaluation::Skip(SkipReason::OutsideWindow);
    }

    let Some(received) = tx.balance_delta(criteria.receiver) else {
        return Evaluation::Skip(SkipReason::ReceiverMissing);
    };
    if (received as f64) < criteria.expected_lamports as f64 * criteria.tolerance {
        return Evaluation::Skip(SkipReason::Underpaid);
    }

    if let Some(sender) = criteria.sender {
        if !tx.balance_delta(sender).is_some_and(|delta| delta < 0) {
            return Evaluation::Skip(SkipReason::SenderMismatch);
        }
    }

    Evaluation::Match {
        received_lamports: received,
        has_memo: criteria.payment_id.is_some_and(|id| tx.memo_contains(id)),
    }
}

/// Scans the payment wallet and claims matching transactions.
#[derive(Clone)]
pub struct PaymentVerifier {
    client: SolanaClient,
    store: Arc<dyn RecordStore>,
}

impl PaymentVerifier {
    pub fn new(client: SolanaClient, store: Arc<dyn RecordStore>) -> Self {
        Self { client, store }
    }

    /// Look for an unclaimed transaction satisfying `request`.
    ///
    /// Returns `Ok(None)` when nothing matched. A match has already been
    /// claimed in the ledger when it is returned.
    pub async fn check(
        &self,
        config: &PaymentConfig,
        request: &PaymentCheckRequest,
    ) -> PaymentResult<Option<PaymentMatch>> {
        let result = self.scan(config, request).await;
        metrics::record_payment_check(match &result {
            Ok(Some(_)) => "confirmed",
            Ok(None) => "not_found",
            Err(_) => "error",
        });
        result
    }

    async fn scan(
        &self,
        config: &PaymentConfig,
        request: &PaymentCheckRequest,
    ) -> PaymentResult<Option<PaymentMatch>> {
        if config.wallet.is_empty() {
            return Err(PaymentError::NotConfigured);
        }
        let receiver: Pubkey = config
            .wallet
            .parse()
            .map_err(|_| PaymentError::InvalidWallet(config.wallet.clone()))?;
        if !request.expected_amount.is_finite() || request.expected_amount <= 0.0 {
            return Err(PaymentError::InvalidAmount);
        }

        let criteria = PaymentCriteria {
            receiver: &config.wallet,
            expected_lamports: sol_to_lamports(request.expected_amount),
            tolerance: config.tolerance,
            sender: request.wallet.as_deref().filter(|w| !w.is_empty()),
            payment_id: request.payment_id.as_deref().filter(|p| !p.is_empty()),
            window_secs: config.window_secs,
        };

        let signatures = self
            .client
            .get_signatures_for_address(&receiver, config.signature_lookback)
            .await?;
        tracing::debug!(count = signatures.len(), "Scanning recent payment signatures");

        for info in signatures {
            if info.err.as_ref().is_some_and(|e| !e.is_null()) {
                continue;
            }
            if self.store.is_payment_used(&info.signature).await? {
                continue;
            }
            let Some(mut tx) = self.client.get_transaction(&info.signature).await? else {
                continue;
            };
            tx.block_time = tx.block_time.or(info.block_time);

            let (received_lamports, has_memo) =
                match evaluate_transaction(&tx, &criteria, Utc::now().timestamp()) {
                    Evaluation::Match {
                        received_lamports,
                        has_memo,
                    } => (received_lamports, has_memo),
                    Evaluation::Skip(reason) => {
                        tracing::trace!(signature = %info.signature, ?reason, "Transaction skipped");
                        continue;
                    }
                };

            let amount = lamports_to_sol(received_lamports);
            let claim = self
                .store
                .claim_payment(UsedPayment::new(&info.signature, amount))
                .await?;
            if claim == ClaimOutcome::AlreadyClaimed {
                tracing::info!(signature = %info.signature, "Payment claimed concurrently; continuing scan");
                continue;
            }

            tracing::info!(signature = %info.signature, amount, has_memo, "Payment confirmed");
            return Ok(Some(PaymentMatch {
                signature: info.signature,
                amount,
                has_memo,
            }));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RECEIVER: &str = "Receiver111";
    const SENDER: &str = "Sender1111";
    const NOW: i64 = 1_700_000_000;

    fn tx(received: u64, block_time: Option<i64>, err: serde_json::Value) -> ParsedTransaction {
        serde_json::from_value(json!({
            "slot": 1,
            "blockTime": block_time,
            "meta": {
                "err": err,
                "fee": 5000,
                "preBalances": [10_000_000_000u64, 1_000_000_000u64],
                "postBalances": [10_000_000_000u64 - received - 5000, 1_000_000_000u64 + received]
            },
            "transaction": {
                "signatures": ["sig"],
                "message": {
                    "accountKeys": [
                        {"pubkey": SENDER, "signer": true, "writable": true},
                        {"pubkey": RECEIVER, "signer": false, "writable": true}
                    ],
                    "instructions": [
                        {"program": "spl-memo", "parsed": "coinfile:pay-42"}
                    ]
                }
            }
        }))
        .unwrap()
    }

    fn criteria() -> PaymentCriteria<'static> {
        PaymentCriteria {
            receiver: RECEIVER,
            expected_lamports: 100_000_000,
            tolerance: 0.99,
            sender: None,
            payment_id: Some("pay-42"),
            window_secs: 1800,
        }
    }

    #[test]
    fn test_exact_payment_matches() {
        let eval = evaluate_transaction(&tx(100_000_000, Some(NOW - 60), json!(null)), &criteria(), NOW);
        assert_eq!(
            eval,
            Evaluation::Match {
                received_lamports: 100_000_000,
                has_memo: true
            }
        );
    }

    #[test]
    fn test_tolerance_boundary() {
        let c = criteria();
        assert!(matches!(
            evaluate_transaction(&tx(99_000_000, Some(NOW), json!(null)), &c, NOW),
            Evaluation::Match { .. }
        ));
        assert_eq!(
            evaluate_transaction(&tx(98_999_999, Some(NOW), json!(null)), &c, NOW),
            Evaluation::Skip(SkipReason::Underpaid)
        );
    }

    #[test]
    fn test_window() {
        let c = criteria();
        assert!(matches!(
            evaluate_transaction(&tx(100_000_000, Some(NOW - 1800), json!(null)), &c, NOW),
            Evaluation::Match { .. }
        ));
        assert_eq!(
            evaluate_transaction(&tx(100_000_000, Some(NOW - 1801), json!(null)), &c, NOW),
            Evaluation::Skip(SkipReason::OutsideWindow)
        );
        assert_eq!(
            evaluate_transaction(&tx(100_000_000, None, json!(null)), &c, NOW),
            Evaluation::Skip(SkipReason::NoBlockTime)
        );
    }

    #[test]
    fn test_failed_transaction_skipped() {
        let eval = evaluate_transaction(
            &tx(100_000_000, Some(NOW), json!({"InstructionError": [0, "Custom"]})),
            &criteria(),
            NOW,
        );
        assert_eq!(eval, Evaluation::Skip(SkipReason::Failed));
    }

    #[test]
    fn test_sender_must_have_paid() {
        let mut c = criteria();
        c.sender = Some(SENDER);
        assert!(matches!(
            evaluate_transaction(&tx(100_000_000, Some(NOW), json!(null)), &c, NOW),
            Evaluation::Match { .. }
        ));
        c.sender = Some("SomeoneElse");
        assert_eq!(
            evaluate_transaction(&tx(100_000_000, Some(NOW), json!(null)), &c, NOW),
            Evaluation::Skip(SkipReason::SenderMismatch)
        );
        c.sender = Some(RECEIVER);
        assert_eq!(
            evaluate_transaction(&tx(100_000_000, Some(NOW), json!(null)), &c, NOW),
            Evaluation::Skip(SkipReason::SenderMismatch)
        );
    }

    #[test]
    fn test_receiver_missing_and_memo() {
        let mut c = criteria();
        c.receiver = "Elsewhere";
        assert_eq!(
            evaluate_transaction(&tx(100_000_000, Some(NOW), json!(null)), &c, NOW),
            Evaluation::Skip(SkipReason::ReceiverMissing)
        );

        let mut c = criteria();
        c.payment_id = None;
        assert_eq!(
            evaluate_transaction(&tx(100_000_000, Some(NOW), json!(null)), &c, NOW),
            Evaluation::Match {
                received_lamports: 100_000_000,
                has_memo: false
            }
        );
    }
}
