//! RPC payload types and error definitions.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert a SOL amount to lamports, rounding to the nearest lamport.
pub fn sol_to_lamports(sol: f64) -> u64 {
    if sol.is_finite() && sol > 0.0 {
        (sol * LAMPORTS_PER_SOL as f64).round() as u64
    } else {
        0
    }
}

pub fn lamports_to_sol(lamports: i128) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC returned error {code}: {message}")]
    RpcResponse { code: i64, message: String },

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// A base58 address failed to decode.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid seeds: {0}")]
    InvalidSeeds(String),

    /// A derived address landed on the ed25519 curve.
    #[error("Derived address is on the curve")]
    AddressOnCurve,

    /// Invalid secret key format or a missing signer.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Payload could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction {signature} not confirmed after {secs} seconds")]
    ConfirmationTimeout { signature: String, secs: u64 },

    /// Transaction landed with an execution error.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// `{context, value}` wrapper used by several RPC methods.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcWithContext<T> {
    pub value: T,
}

/// Entry from `getSignaturesForAddress`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// `getTransaction` result in `jsonParsed` encoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
    pub transaction: TransactionBody,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionBody {
    #[serde(default)]
    pub signatures: Vec<String>,
    pub message: ParsedMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    #[serde(default)]
    pub account_keys: Vec<AccountKey>,
    #[serde(default)]
    pub instructions: Vec<ParsedInstruction>,
}

/// Account keys come back as objects in `jsonParsed` and as plain
/// strings in other encodings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountKey {
    Parsed {
        pubkey: String,
        #[serde(default)]
        signer: bool,
        #[serde(default)]
        writable: bool,
    },
    Plain(String),
}

impl AccountKey {
    pub fn pubkey(&self) -> &str {
        match self {
            AccountKey::Parsed { pubkey, .. } => pubkey,
            AccountKey::Plain(pubkey) => pubkey,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstruction {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub program_id: Option<String>,
    #[serde(default)]
    pub parsed: Option<Value>,
    #[serde(default)]
    pub data: Option<String>,
}

impl ParsedInstruction {
    fn is_memo(&self) -> bool {
        self.program.as_deref() == Some("spl-memo")
            || self.program_id.as_deref()
                == Some("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr")
    }
}

impl ParsedTransaction {
    /// True when the transaction executed with an error or has no meta.
    pub fn is_failed(&self) -> bool {
        match &self.meta {
            Some(meta) => meta.err.as_ref().is_some_and(|e| !e.is_null()),
            None => true,
        }
    }

    /// Lamport balance change of `address`, if it is part of the transaction.
    pub fn balance_delta(&self, address: &str) -> Option<i128> {
        let meta = self.meta.as_ref()?;
        let index = self
            .transaction
            .message
            .account_keys
            .iter()
            .position(|key| key.pubkey() == address)?;
        let pre = *meta.pre_balances.get(index)?;
        let post = *meta.post_balances.get(index)?;
        Some(post as i128 - pre as i128)
    }

    /// Whether any memo instruction mentions `needle`.
    pub fn memo_contains(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        self.transaction
            .message
            .instructions
            .iter()
            .filter(|ix| ix.is_memo())
            .any(|ix| {
                let parsed = ix.parsed.as_ref().and_then(Value::as_str);
                parsed.or(ix.data.as_deref()).is_some_and(|memo| memo.contains(needle))
            })
    }
}

/// Entry from `getSignatureStatuses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockhashInfo {
    pub blockhash: String,
    #[serde(default)]
    pub last_valid_block_height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tx() -> ParsedTransaction {
        serde_json::from_value(json!({
            "slot": 10,
            "blockTime": 1_700_000_000,
            "meta": {
                "err": null,
                "fee": 5000,
                "preBalances": [5_000_000_000u64, 1_000_000_000u64, 1],
                "postBalances": [3_999_995_000u64, 2_000_000_000u64, 1]
            },
            "transaction": {
                "signatures": ["sig1"],
                "message": {
                    "accountKeys": [
                        {"pubkey": "Sender1111", "signer": true, "writable": true},
                        {"pubkey": "Receiver111", "signer": false, "writable": true},
                        "11111111111111111111111111111111"
                    ],
                    "instructions": [
                        {"program": "spl-memo", "programId": "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr", "parsed": "pay-abc123"}
                    ]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_balance_delta() {
        let tx = sample_tx();
        assert_eq!(tx.balance_delta("Receiver111"), Some(1_000_000_000));
        assert_eq!(tx.balance_delta("Sender1111"), Some(-1_000_005_000));
        assert_eq!(tx.balance_delta("Nobody"), None);
        assert!(!tx.is_failed());
    }

    #[test]
    fn test_memo_detection() {
        let tx = sample_tx();
        assert!(tx.memo_contains("abc123"));
        assert!(!tx.memo_contains("zzz"));
        assert!(!tx.memo_contains(""));
    }

    #[test]
    fn test_failed_transaction() {
        let mut tx = sample_tx();
        tx.meta.as_mut().unwrap().err = Some(json!({"InstructionError": [0, "Custom"]}));
        assert!(tx.is_failed());
        tx.meta = None;
        assert!(tx.is_failed());
    }

    #[test]
    fn test_sol_conversions() {
        assert_eq!(sol_to_lamports(0.1), 100_000_000);
        assert_eq!(sol_to_lamports(-1.0), 0);
        assert_eq!(sol_to_lamports(f64::NAN), 0);
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");
        let err = BlockchainError::RpcResponse {
            code: -32602,
            message: "Invalid params".into(),
        };
        assert!(err.to_string().contains("-32602"));
    }
}
