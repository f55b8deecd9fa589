//! Solana JSON-RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Speak JSON-RPC 2.0 to one or more endpoints
//! - Query signatures, parsed transactions, token balances, blockhashes
//! - Broadcast signed transactions and read their status
//! - Fail over to the next endpoint on transport errors and timeouts

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::blockchain::pubkey::Pubkey;
use crate::blockchain::transaction::Transaction;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, BlockhashInfo, ParsedTransaction, RpcWithContext,
    SignatureInfo, SignatureStatus,
};
use crate::config::BlockchainConfig;
use crate::observability::metrics;

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Solana RPC client wrapper with failover support.
#[derive(Clone)]
pub struct SolanaClient {
    http: reqwest::Client,
    /// Primary endpoint first, then failovers.
    endpoints: Arc<Vec<url::Url>>,
    commitment: String,
    timeout_duration: Duration,
    next_id: Arc<AtomicU64>,
}

impl SolanaClient {
    /// Create a new client. Invalid failover URLs are skipped with a warning.
    pub fn new(config: &BlockchainConfig) -> BlockchainResult<Self> {
        let primary: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let mut endpoints = vec![primary];
        for url_str in &config.failover_urls {
            match url_str.parse() {
                Ok(url) => endpoints.push(url),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BlockchainError::Rpc(e.to_string()))?;

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = endpoints.len() - 1,
            "Solana RPC client initialized"
        );

        Ok(Self {
            http,
            endpoints: Arc::new(endpoints),
            commitment: config.commitment.clone(),
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Issue one JSON-RPC call, trying each endpoint in turn.
    ///
    /// A JSON-RPC error object is a definitive answer and is returned
    /// without trying the remaining endpoints.
    async fn call<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> BlockchainResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let start = Instant::now();

        for (i, endpoint) in self.endpoints.iter().enumerate() {
            let fut = async {
                self.http
                    .post(endpoint.clone())
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<RpcEnvelope>()
                    .await
            };
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(envelope)) => {
                    metrics::record_rpc_call(method, start);
                    if let Some(err) = envelope.error {
                        return Err(BlockchainError::RpcResponse {
                            code: err.code,
                            message: err.message,
                        });
                    }
                    return serde_json::from_value(envelope.result).map_err(|e| {
                        BlockchainError::Encoding(format!("{} result: {}", method, e))
                    });
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                }
            }
        }
        metrics::record_rpc_failure(method);
        Err(BlockchainError::Rpc(format!(
            "All RPC providers failed for {}",
            method
        )))
    }

    /// Most recent signatures touching `address`, newest first.
    pub async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> BlockchainResult<Vec<SignatureInfo>> {
        self.call(
            "getSignaturesForAddress",
            json!([address.to_string(), { "limit": limit, "commitment": self.commitment }]),
        )
        .await
    }

    /// Full transaction detail, or `None` if the node does not know it.
    pub async fn get_transaction(&self, signature: &str) -> BlockchainResult<Option<ParsedTransaction>> {
        self.call(
            "getTransaction",
            json!([
                signature,
                {
                    "encoding": "jsonParsed",
                    "maxSupportedTransactionVersion": 0,
                    "commitment": self.commitment,
                }
            ]),
        )
        .await
    }

    /// UI-denominated balance of `mint` held by `owner`, summed across
    /// its token accounts.
    pub async fn get_token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> BlockchainResult<f64> {
        let accounts: RpcWithContext<Vec<Value>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    { "mint": mint.to_string() },
                    { "encoding": "jsonParsed", "commitment": self.commitment }
                ]),
            )
            .await?;

        Ok(accounts
            .value
            .iter()
            .filter_map(|acct| {
                acct.pointer("/account/data/parsed/info/tokenAmount/uiAmount")
                    .and_then(Value::as_f64)
            })
            .sum())
    }

    pub async fn get_latest_blockhash(&self) -> BlockchainResult<[u8; 32]> {
        let info: RpcWithContext<BlockhashInfo> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment }]),
            )
            .await?;
        let bytes = bs58::decode(&info.value.blockhash)
            .into_vec()
            .map_err(|e| BlockchainError::Encoding(format!("blockhash: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| BlockchainError::Encoding("blockhash is not 32 bytes".to_string()))
    }

    pub async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> BlockchainResult<u64> {
        self.call("getMinimumBalanceForRentExemption", json!([data_len]))
            .await
    }

    /// Broadcast a signed transaction; returns its signature.
    pub async fn send_transaction(&self, tx: &Transaction) -> BlockchainResult<String> {
        self.call(
            "sendTransaction",
            json!([
                tx.to_base64()?,
                { "encoding": "base64", "preflightCommitment": self.commitment }
            ]),
        )
        .await
    }

    pub async fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> BlockchainResult<Vec<Option<SignatureStatus>>> {
        let statuses: RpcWithContext<Vec<Option<SignatureStatus>>> = self
            .call("getSignatureStatuses", json!([signatures]))
            .await?;
        Ok(statuses.value)
    }

    /// True when the node reports itself healthy.
    pub async fn is_healthy(&self) -> bool {
        matches!(
            self.call::<String>("getHealth", json!([])).await.as_deref(),
            Ok("ok")
        )
    }
}

impl std::fmt::Debug for SolanaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaClient")
            .field("rpc_url", &self.endpoints.first().map(url::Url::as_str))
            .field("failovers", &self.endpoints.len().saturating_sub(1))
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BlockchainConfig {
        BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 2,
            commitment: "confirmed".to_string(),
        }
    }

    #[test]
    fn test_client_creation_skips_bad_failover() {
        let mut config = test_config();
        config.failover_urls.push("not a url".to_string());
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        let client = SolanaClient::new(&config).unwrap();
        assert_eq!(client.endpoints.len(), 2);
    }

    #[test]
    fn test_invalid_primary_rejected() {
        let mut config = test_config();
        config.rpc_url = "::nope::".to_string();
        assert!(SolanaClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausted() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        let client = SolanaClient::new(&config).unwrap();

        let result = client.get_minimum_balance_for_rent_exemption(82).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("All RPC providers failed"));
        assert!(!client.is_healthy().await);
    }
}
