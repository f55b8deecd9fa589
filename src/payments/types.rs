//! Payment check request/response and error types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::db::{DbError, UsedPayment};

/// Body of `POST /api/check-payment`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCheckRequest {
    /// Reference the payer is asked to put in a memo.
    #[serde(default)]
    pub payment_id: Option<String>,
    /// Amount in SOL.
    #[serde(default)]
    pub expected_amount: f64,
    /// Paying wallet, when known.
    #[serde(default)]
    pub wallet: Option<String>,
}

/// A transaction credited to a payment check.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMatch {
    pub signature: String,
    /// SOL received by the payment wallet.
    pub amount: f64,
    pub has_memo: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCheckResponse {
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_memo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentCheckResponse {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

impl From<PaymentMatch> for PaymentCheckResponse {
    fn from(m: PaymentMatch) -> Self {
        Self {
            confirmed: true,
            tx_signature: Some(m.signature),
            amount: Some(m.amount),
            has_memo: Some(m.has_memo),
            error: None,
        }
    }
}

/// Query of `GET /api/payments/recent`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentPaymentsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

impl RecentPaymentsQuery {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 100;

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// One ledger entry as reported to operators.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub tx_signature: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_for: Option<String>,
}

impl From<UsedPayment> for LedgerEntry {
    fn from(p: UsedPayment) -> Self {
        Self {
            tx_signature: p.tx_signature,
            amount: p.amount,
            created_at: p.created_at,
            redeemed_at: p.redeemed_at,
            redeemed_for: p.redeemed_for,
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment wallet not configured")]
    NotConfigured,

    #[error("Invalid payment wallet: {0}")]
    InvalidWallet(String),

    #[error("Invalid expected amount")]
    InvalidAmount,

    /// The signature has not been credited by a payment check.
    #[error("Payment not verified")]
    NotVerified,

    /// The credited payment already unlocked another action.
    #[error("Payment already used")]
    AlreadyRedeemed,

    #[error("Payment of {paid} SOL is below the {required} SOL fee")]
    Underpaid { paid: f64, required: f64 },

    #[error("RPC failure: {0}")]
    Rpc(#[from] BlockchainError),

    #[error("Ledger failure: {0}")]
    Ledger(#[from] DbError),
}

impl PaymentError {
    /// Whether the client has to pay (again) for the action to go through.
    pub fn is_payment_required(&self) -> bool {
        matches!(
            self,
            PaymentError::NotVerified
                | PaymentError::AlreadyRedeemed
                | PaymentError::Underpaid { .. }
        )
    }

    /// Message returned to clients in the soft-failure body.
    pub fn client_message(&self) -> &'static str {
        match self {
            PaymentError::NotConfigured => "Payment wallet not configured",
            PaymentError::InvalidWallet(_) => "Payment wallet not configured",
            PaymentError::InvalidAmount => "Invalid expected amount",
            PaymentError::NotVerified => "Payment not verified",
            PaymentError::AlreadyRedeemed => "Payment already used",
            PaymentError::Underpaid { .. } => "Payment below the required fee",
            PaymentError::Rpc(_) => "Failed to check transactions",
            PaymentError::Ledger(_) => "Failed to check payment",
        }
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recent_limit_is_clamped() {
        assert_eq!(RecentPaymentsQuery::default().limit(), 20);
        assert_eq!(RecentPaymentsQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(RecentPaymentsQuery { limit: Some(5000) }.limit(), 100);
    }

    #[test]
    fn test_request_accepts_camel_case() {
        let req: PaymentCheckRequest = serde_json::from_value(json!({
            "paymentId": "pay-1",
            "expectedAmount": 0.05,
            "wallet": "abc"
        }))
        .unwrap();
        assert_eq!(req.payment_id.as_deref(), Some("pay-1"));
        assert_eq!(req.expected_amount, 0.05);
    }

    #[test]
    fn test_response_shapes() {
        let confirmed = PaymentCheckResponse::from(PaymentMatch {
            signature: "sig".into(),
            amount: 0.05,
            has_memo: true,
        });
        assert_eq!(
            serde_json::to_value(&confirmed).unwrap(),
            json!({"confirmed": true, "txSignature": "sig", "amount": 0.05, "hasMemo": true})
        );
        assert_eq!(
            serde_json::to_value(PaymentCheckResponse::not_found()).unwrap(),
            json!({"confirmed": false})
        );
        assert_eq!(
            serde_json::to_value(PaymentCheckResponse::failed("x")).unwrap(),
            json!({"confirmed": false, "error": "x"})
        );
    }
}
