//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the RPC client, blob store and record store the config selects
//! - Load the optional mint authority from the environment
//! - Assemble shared application state
//!
//! Any error here is fatal: the process exits before binding a listener.

use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::wallet::MINT_PRIVATE_KEY_ENV_VAR;
use crate::blockchain::{BlockchainError, Keypair, SolanaClient, TxSubmitter};
use crate::config::{AppConfig, DatabaseBackendKind, StorageBackendKind};
use crate::db::{MemoryStore, RecordStore, SupabaseDb};
use crate::files::FileService;
use crate::http::AppState;
use crate::mint::NftMinter;
use crate::payments::PaymentVerifier;
use crate::storage::{BlobStore, LocalBlobStore, SupabaseStorage};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("RPC client: {0}")]
    Blockchain(#[from] BlockchainError),

    #[error("HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to load metadata snapshot: {0}")]
    Snapshot(#[from] std::io::Error),
}

/// Blob store for the configured backend.
pub fn build_blob_store(config: &AppConfig, http: &reqwest::Client) -> Arc<dyn BlobStore> {
    match config.storage.backend {
        StorageBackendKind::Supabase => Arc::new(SupabaseStorage::new(
            http.clone(),
            &config.supabase.url,
            &config.storage.bucket,
            &config.supabase.service_key,
        )),
        StorageBackendKind::Local => {
            let public_base = format!("{}/blobs", config.files.public_base_url.trim_end_matches('/'));
            Arc::new(LocalBlobStore::new(&config.storage.local_root, &public_base))
        }
    }
}

/// Record store for the configured backend.
pub fn build_record_store(
    config: &AppConfig,
    http: &reqwest::Client,
) -> Result<Arc<dyn RecordStore>, StartupError> {
    Ok(match config.database.backend {
        DatabaseBackendKind::Supabase => Arc::new(SupabaseDb::new(
            http.clone(),
            &config.supabase.url,
            &config.supabase.service_key,
        )),
        DatabaseBackendKind::Memory => match &config.database.persistence_path {
            Some(path) => Arc::new(MemoryStore::load_from_file(&PathBuf::from(path))?),
            None => Arc::new(MemoryStore::new(None)),
        },
    })
}

/// The mint authority, if `COINFILE_MINT_PRIVATE_KEY` is set. A key that is
/// set but unreadable is logged and minting stays disabled.
pub fn load_mint_authority() -> Option<Arc<Keypair>> {
    if std::env::var_os(MINT_PRIVATE_KEY_ENV_VAR).is_none() {
        tracing::warn!("{} not set; minting disabled", MINT_PRIVATE_KEY_ENV_VAR);
        return None;
    }
    match Keypair::from_env() {
        Ok(keypair) => Some(Arc::new(keypair)),
        Err(e) => {
            tracing::error!(error = %e, "Invalid mint authority key; minting disabled");
            None
        }
    }
}

/// Assemble application state from explicit parts.
pub fn assemble_state(
    config: AppConfig,
    client: SolanaClient,
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    mint_authority: Option<Arc<Keypair>>,
) -> AppState {
    let minter = mint_authority.map(|authority| {
        let submitter = TxSubmitter::new(
            client.clone(),
            Duration::from_secs(config.mint.confirm_timeout_secs),
            Duration::from_millis(config.mint.confirm_poll_ms),
        );
        NftMinter::new(authority, submitter, blobs.clone())
    });

    AppState {
        files: FileService::new(store.clone(), blobs, client.clone()),
        payments: PaymentVerifier::new(client.clone(), store.clone()),
        minter,
        store,
        client,
        config: Arc::new(ArcSwap::from_pointee(config)),
    }
}

/// Build everything the config asks for.
pub fn build_state(config: AppConfig) -> Result<AppState, StartupError> {
    let http = reqwest::Client::builder().build()?;
    let client = SolanaClient::new(&config.blockchain)?;
    let blobs = build_blob_store(&config, &http);
    let store = build_record_store(&config, &http)?;
    let mint_authority = load_mint_authority();

    tracing::info!(
        storage = blobs.provider(),
        database = ?config.database.backend,
        minting = mint_authority.is_some(),
        "Subsystems initialized"
    );
    Ok(assemble_state(config, client, store, blobs, mint_authority))
}
