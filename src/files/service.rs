//! File operations shared by the HTTP handlers.

use axum::body::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::blockchain::{Pubkey, SolanaClient};
use crate::config::AppConfig;
use crate::db::{FileRecord, RecordStore, StorageProvider, UserRecord, ANONYMOUS_OWNER};
use crate::observability::metrics;
use crate::payments::{redeem_payment, release_payment, PaidAction};
use crate::storage::{BlobStore, StorageError};
use crate::tiers::{limits_for, resolve_tier, Tier};

use super::ids::{generate_short_id, object_key};
use super::{FilesError, FilesResult};

const MIB: f64 = 1024.0 * 1024.0;
/// Fresh short ids to try when an object key is already taken.
const KEY_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Cloud,
    Onchain,
}

impl StorageType {
    /// Anything other than `onchain` is cloud storage.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("onchain") => StorageType::Onchain,
            _ => StorageType::Cloud,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Cloud => "cloud",
            StorageType::Onchain => "onchain",
        }
    }
}

/// A parsed upload form.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
    pub wallet: Option<String>,
    pub storage_type: StorageType,
    pub tx_signature: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub id: String,
    pub short_id: String,
    pub url: String,
    pub message: String,
    pub storage_type: &'static str,
    pub tx_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletListing {
    pub files: Vec<FileRecord>,
    pub storage_used: u64,
    pub storage_limit: u64,
    pub tier: Tier,
}

/// Wallets double as object-key prefixes, so only real addresses pass.
fn parse_wallet(wallet: &str) -> FilesResult<String> {
    let wallet = wallet.trim();
    match wallet.parse::<Pubkey>() {
        Ok(key) => Ok(key.to_string()),
        Err(_) => {
            tracing::debug!(wallet = %wallet, "Rejecting malformed wallet");
            Err(FilesError::InvalidWallet)
        }
    }
}

#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    client: SolanaClient,
}

impl FileService {
    pub fn new(store: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>, client: SolanaClient) -> Self {
        Self {
            store,
            blobs,
            client,
        }
    }

    /// Resolve the wallet's live tier, persisting it when it moved.
    async fn refresh_tier(&self, config: &AppConfig, user: &UserRecord) -> FilesResult<Tier> {
        let tier = resolve_tier(&self.client, &user.wallet_address, &config.tiers).await;
        if tier != user.tier {
            tracing::info!(wallet = %user.wallet_address, from = %user.tier, to = %tier, "Tier changed");
            self.store.set_user_tier(&user.wallet_address, tier).await?;
        }
        Ok(tier)
    }

    pub async fn upload(&self, config: &AppConfig, upload: NewUpload) -> FilesResult<UploadOutcome> {
        let size = upload.data.len() as u64;
        let owner = match upload.wallet.as_deref().map(str::trim) {
            Some(w) if !w.is_empty() && w != ANONYMOUS_OWNER => Some(parse_wallet(w)?),
            _ => None,
        };

        let user = match &owner {
            Some(wallet) => Some(self.store.get_or_create_user(wallet).await?),
            None => None,
        };
        let tier = match &user {
            Some(user) => self.refresh_tier(config, user).await?,
            None => Tier::Free,
        };
        let limits = limits_for(tier, &config.tiers);

        let max_size = match upload.storage_type {
            StorageType::Onchain => config.files.onchain_max_file_bytes,
            StorageType::Cloud => limits.per_file_bytes,
        };
        if size > max_size {
            return Err(FilesError::TooLarge {
                storage_type: upload.storage_type.as_str().to_string(),
                max_mb: max_size as f64 / MIB,
            });
        }

        let tx_signature = upload
            .tx_signature
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if upload.storage_type == StorageType::Onchain && tx_signature.is_none() {
            return Err(FilesError::PaymentRequired);
        }

        if let Some(user) = &user {
            if user.total_storage_used.saturating_add(size) > limits.total_bytes {
                tracing::info!(
                    wallet = %user.wallet_address,
                    used = user.total_storage_used,
                    size,
                    limit = limits.total_bytes,
                    "Upload rejected by quota"
                );
                return Err(FilesError::QuotaExceeded);
            }
        }

        // spent last, so a rejected upload keeps the payment
        let redeemed = match upload.storage_type {
            StorageType::Onchain => Some(
                redeem_payment(
                    self.store.as_ref(),
                    tx_signature,
                    config.files.onchain_fee_sol,
                    config.payments.tolerance,
                    PaidAction::OnchainUpload,
                )
                .await?,
            ),
            StorageType::Cloud => None,
        };

        let owner_label = owner.as_deref().unwrap_or(ANONYMOUS_OWNER);
        let recorded_signature = redeemed
            .clone()
            .or_else(|| tx_signature.map(str::to_string));
        let stored = self
            .store_upload(owner_label, &upload, size, recorded_signature)
            .await;
        let record = match stored {
            Ok(record) => record,
            Err(e) => {
                if let Some(signature) = &redeemed {
                    release_payment(self.store.as_ref(), signature).await;
                }
                return Err(e);
            }
        };

        if let Some(wallet) = &owner {
            self.store.adjust_storage_used(wallet, size as i64).await?;
        }

        metrics::record_upload(upload.storage_type.as_str(), size);
        tracing::info!(
            id = %record.id,
            short_id = %record.short_id,
            owner = %record.owner_wallet,
            size,
            storage_type = upload.storage_type.as_str(),
            payment_id = upload.payment_id.as_deref().unwrap_or(""),
            "File uploaded"
        );

        Ok(UploadOutcome {
            id: record.id,
            short_id: record.short_id,
            url: record.url,
            message: "File uploaded successfully".to_string(),
            storage_type: upload.storage_type.as_str(),
            tx_signature: record.tx_signature,
        })
    }

    /// Write the blob and its row. The blob is removed again when the row
    /// insert fails.
    async fn store_upload(
        &self,
        owner: &str,
        upload: &NewUpload,
        size: u64,
        tx_signature: Option<String>,
    ) -> FilesResult<FileRecord> {
        let (short_id, path) = self.put_blob(owner, upload).await?;
        let url = self.blobs.public_url(&path);

        let storage_provider = match upload.storage_type {
            StorageType::Onchain => StorageProvider::Solana,
            StorageType::Cloud => StorageProvider::from_tag(self.blobs.provider()),
        };
        let record = FileRecord {
            id: uuid::Uuid::new_v4().to_string(),
            short_id,
            owner_wallet: owner.to_string(),
            original_filename: upload.file_name.clone(),
            size_bytes: size,
            storage_provider,
            storage_path: path.clone(),
            url,
            is_public: true,
            created_at: Utc::now(),
            tx_signature,
        };

        match self.store.insert_file(record).await {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Row insert failed; removing blob");
                if let Err(cleanup) = self.blobs.delete(&path).await {
                    tracing::warn!(path = %path, error = %cleanup, "Failed to remove orphaned blob");
                }
                Err(e.into())
            }
        }
    }

    /// Write the blob under a fresh short id, retrying on key collisions.
    async fn put_blob(&self, owner: &str, upload: &NewUpload) -> FilesResult<(String, String)> {
        let content_type = if upload.content_type.is_empty() {
            "application/octet-stream"
        } else {
            upload.content_type.as_str()
        };

        let mut last_err = None;
        for _ in 0..KEY_ATTEMPTS {
            let short_id = generate_short_id();
            let path = object_key(owner, &short_id, &upload.file_name);
            match self.blobs.put(&path, upload.data.clone(), content_type).await {
                Ok(()) => return Ok((short_id, path)),
                Err(StorageError::ObjectAlreadyExists(taken)) => {
                    tracing::debug!(path = %taken, "Object key taken; retrying");
                    last_err = Some(StorageError::ObjectAlreadyExists(taken));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(last_err
            .unwrap_or_else(|| StorageError::InvalidPath(owner.to_string()))
            .into())
    }

    pub async fn list_for_wallet(&self, config: &AppConfig, wallet: &str) -> FilesResult<WalletListing> {
        let wallet = parse_wallet(wallet)?;
        let wallet = wallet.as_str();
        let user = self.store.get_or_create_user(wallet).await?;
        let files = self.store.list_files_by_owner(wallet).await?;
        let tier = self.refresh_tier(config, &user).await?;
        let limits = limits_for(tier, &config.tiers);

        Ok(WalletListing {
            files,
            storage_used: user.total_storage_used,
            storage_limit: limits.total_bytes,
            tier,
        })
    }

    pub async fn get(&self, id: &str) -> FilesResult<FileRecord> {
        self.store.get_file(id).await?.ok_or(FilesError::NotFound)
    }

    /// Short id first, then the full id.
    pub async fn resolve_share(&self, id: &str) -> FilesResult<FileRecord> {
        if let Some(file) = self.store.get_file_by_short_id(id).await? {
            return Ok(file);
        }
        self.get(id).await
    }

    pub async fn explorer(&self, limit: usize) -> FilesResult<Vec<FileRecord>> {
        Ok(self.store.list_public_files(limit).await?)
    }

    pub async fn delete(&self, id: &str, wallet: &str) -> FilesResult<()> {
        let file = self.get(id).await?;
        if !file.is_owned_by(wallet) {
            tracing::warn!(id = %id, wallet = %wallet, "Delete refused for non-owner");
            return Err(FilesError::Forbidden);
        }

        if let Err(e) = self.blobs.delete(&file.storage_path).await {
            tracing::warn!(path = %file.storage_path, error = %e, "Blob delete failed; removing row anyway");
        }
        self.store.delete_file(id).await?;
        self.store
            .adjust_storage_used(&file.owner_wallet, -(file.size_bytes.min(i64::MAX as u64) as i64))
            .await?;

        tracing::info!(id = %id, owner = %file.owner_wallet, "File deleted");
        Ok(())
    }

    pub async fn set_visibility(&self, id: &str, wallet: &str, is_public: bool) -> FilesResult<()> {
        let file = self.store.get_file(id).await?;
        match file {
            Some(file) if file.is_owned_by(wallet) => {}
            _ => return Err(FilesError::Forbidden),
        }
        if !self.store.set_file_visibility(id, is_public).await? {
            return Err(FilesError::NotFound);
        }
        tracing::info!(id = %id, is_public, "File visibility updated");
        Ok(())
    }
}
