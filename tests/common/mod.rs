//! Shared utilities for integration tests: a scriptable Solana RPC and a
//! server spawner wired to in-memory stores.

#![allow(dead_code)]

use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use coinfile::blockchain::{Keypair, Pubkey, SolanaClient};
use coinfile::config::AppConfig;
use coinfile::db::MemoryStore;
use coinfile::lifecycle::assemble_state;
use coinfile::storage::LocalBlobStore;
use coinfile::HttpServer;

pub const MIB: u64 = 1024 * 1024;

pub fn address(byte: u8) -> String {
    Pubkey::new([byte; 32]).to_string()
}

/// Receiving wallet configured for payments.
pub fn payment_wallet() -> String {
    address(3)
}

/// What the mock chain answers.
#[derive(Default)]
pub struct MockChain {
    /// `getSignaturesForAddress` result, newest first.
    pub signatures: Vec<Value>,
    pub transactions: HashMap<String, Value>,
    pub token_balance: f64,
    /// Answer every call with a JSON-RPC error.
    pub failing: bool,
    /// Signatures received through `sendTransaction`.
    pub sent: Vec<String>,
}

impl MockChain {
    /// Add a confirmed SOL transfer to the head of the signature list.
    pub fn push_payment(&mut self, signature: &str, sender: &str, lamports: u64, block_time: i64) {
        let receiver = payment_wallet();
        self.signatures.insert(
            0,
            json!({ "signature": signature, "slot": 1, "err": null, "blockTime": block_time }),
        );
        self.transactions.insert(
            signature.to_string(),
            json!({
                "slot": 1,
                "blockTime": block_time,
                "meta": {
                    "err": null,
                    "fee": 5000,
                    "preBalances": [10_000_000_000u64, 500_000_000u64, 1],
                    "postBalances": [10_000_000_000u64 - lamports - 5000, 500_000_000u64 + lamports, 1]
                },
                "transaction": {
                    "signatures": [signature],
                    "message": {
                        "accountKeys": [
                            { "pubkey": sender, "signer": true, "writable": true },
                            { "pubkey": receiver, "signer": false, "writable": true },
                            { "pubkey": "11111111111111111111111111111111", "signer": false, "writable": false }
                        ],
                        "instructions": [
                            { "program": "spl-memo", "parsed": format!("coinfile {signature}") }
                        ]
                    }
                }
            }),
        );
    }
}

pub type SharedChain = Arc<Mutex<MockChain>>;

fn rpc_result(id: &Value, result: Value) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn handle_rpc(chain: SharedChain, request: Value) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();
    let mut chain = chain.lock().unwrap();

    if chain.failing {
        return Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": "node is behind" }
        }));
    }

    match method.as_str() {
        "getHealth" => rpc_result(&id, json!("ok")),
        "getSignaturesForAddress" => rpc_result(&id, json!(chain.signatures)),
        "getTransaction" => {
            let sig = params[0].as_str().unwrap_or_default();
            rpc_result(&id, chain.transactions.get(sig).cloned().unwrap_or(Value::Null))
        }
        "getTokenAccountsByOwner" => rpc_result(
            &id,
            json!({
                "context": { "slot": 1 },
                "value": [{
                    "pubkey": address(40),
                    "account": { "data": { "parsed": { "info": {
                        "tokenAmount": { "uiAmount": chain.token_balance }
                    } } } }
                }]
            }),
        ),
        "getLatestBlockhash" => rpc_result(
            &id,
            json!({
                "context": { "slot": 1 },
                "value": { "blockhash": address(1), "lastValidBlockHeight": 100 }
            }),
        ),
        "getMinimumBalanceForRentExemption" => rpc_result(&id, json!(1_461_600)),
        "sendTransaction" => {
            let wire = BASE64
                .decode(params[0].as_str().unwrap_or_default())
                .unwrap_or_default();
            // one-byte signature count, then the fee payer's signature
            let signature = bs58::encode(&wire[1..65]).into_string();
            chain.sent.push(signature.clone());
            rpc_result(&id, json!(signature))
        }
        "getSignatureStatuses" => {
            let count = params[0].as_array().map(Vec::len).unwrap_or(0);
            let statuses: Vec<Value> = (0..count)
                .map(|_| json!({ "slot": 1, "err": null, "confirmationStatus": "confirmed" }))
                .collect();
            rpc_result(&id, json!({ "context": { "slot": 1 }, "value": statuses }))
        }
        other => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("Method not found: {other}") }
        })),
    }
}

/// Serve a mock JSON-RPC endpoint; returns its URL.
pub async fn start_mock_rpc(chain: SharedChain) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Router::new().route(
        "/",
        post(move |Json(request): Json<Value>| handle_rpc(chain.clone(), request)),
    );
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub struct TestApp {
    pub base_url: String,
    pub chain: SharedChain,
    pub store: MemoryStore,
    pub http: reqwest::Client,
    pub blob_root: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

impl TestApp {
    pub fn api(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }
}

/// Start a server against the mock chain with in-memory stores.
pub async fn spawn_app(
    configure: impl FnOnce(&mut AppConfig),
    mint_authority: Option<Keypair>,
) -> TestApp {
    let chain: SharedChain = Arc::new(Mutex::new(MockChain::default()));
    let rpc_url = start_mock_rpc(chain.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let blob_root = dir.path().join("blobs");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let mut config = AppConfig::default();
    config.blockchain.rpc_url = rpc_url;
    config.blockchain.rpc_timeout_secs = 5;
    config.payments.wallet = payment_wallet();
    config.files.public_base_url = base_url.clone();
    config.storage.local_root = blob_root.to_string_lossy().into_owned();
    config.mint.confirm_poll_ms = 10;
    config.mint.confirm_timeout_secs = 5;
    configure(&mut config);

    let client = SolanaClient::new(&config.blockchain).unwrap();
    let store = MemoryStore::new(None);
    let blobs = LocalBlobStore::new(&blob_root, &format!("{base_url}/blobs"));
    let state = assemble_state(
        config,
        client,
        Arc::new(store.clone()),
        Arc::new(blobs),
        mint_authority.map(Arc::new),
    );

    let router = HttpServer::new(state).into_router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        base_url,
        chain,
        store,
        http: reqwest::Client::new(),
        blob_root,
        _dir: dir,
    }
}

/// Multipart upload of `size` bytes named `name`.
pub async fn upload(
    app: &TestApp,
    name: &str,
    size: usize,
    fields: &[(&str, &str)],
) -> reqwest::Response {
    let mut form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![b'a'; size])
            .file_name(name.to_string())
            .mime_str("text/plain")
            .unwrap(),
    );
    for (key, value) in fields {
        form = form.text(key.to_string(), value.to_string());
    }
    app.http
        .post(app.api("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
