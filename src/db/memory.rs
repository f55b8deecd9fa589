//! In-memory metadata store with JSON snapshot persistence.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::errors::DbResult;
use super::models::{FileRecord, UsedPayment, UserRecord};
use super::store::{apply_delta, ClaimOutcome, RecordStore, RedeemOutcome};
use crate::tiers::Tier;

/// On-disk snapshot layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    files: Vec<FileRecord>,
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    used_payments: Vec<UsedPayment>,
}

/// A thread-safe store backed by concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    files: Arc<DashMap<String, FileRecord>>,
    users: Arc<DashMap<String, UserRecord>>,
    payments: Arc<DashMap<String, UsedPayment>>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            persistence_path,
            ..Self::default()
        }
    }

    /// Load from a snapshot if one exists; the path is kept for later saves.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;

            for file in snapshot.files {
                store.files.insert(file.id.clone(), file);
            }
            for user in snapshot.users {
                store.users.insert(user.wallet_address.clone(), user);
            }
            for payment in snapshot.used_payments {
                store.payments.insert(payment.tx_signature.clone(), payment);
            }
            tracing::info!(
                files = store.files.len(),
                users = store.users.len(),
                used_payments = store.payments.len(),
                "Loaded metadata snapshot"
            );
        }
        Ok(store)
    }

    /// Write the snapshot, if a persistence path is set.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let snapshot = Snapshot {
                files: self.files.iter().map(|r| r.value().clone()).collect(),
                users: self.users.iter().map(|r| r.value().clone()).collect(),
                used_payments: self.payments.iter().map(|r| r.value().clone()).collect(),
            };
            // write beside the target, then rename over it
            let tmp = path.with_extension("json.tmp");
            {
                let mut writer = BufWriter::new(File::create(&tmp)?);
                serde_json::to_writer(&mut writer, &snapshot)?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            std::fs::rename(&tmp, path)?;
            tracing::info!(files = snapshot.files.len(), "Saved metadata snapshot");
        }
        Ok(())
    }

    fn sorted_newest_first(mut files: Vec<FileRecord>) -> Vec<FileRecord> {
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        files
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_file(&self, file: FileRecord) -> DbResult<FileRecord> {
        self.files.insert(file.id.clone(), file.clone());
        Ok(file)
    }

    async fn get_file(&self, id: &str) -> DbResult<Option<FileRecord>> {
        Ok(self.files.get(id).map(|r| r.value().clone()))
    }

    async fn get_file_by_short_id(&self, short_id: &str) -> DbResult<Option<FileRecord>> {
        Ok(self
            .files
            .iter()
            .find(|r| r.value().short_id == short_id)
            .map(|r| r.value().clone()))
    }

    async fn list_files_by_owner(&self, owner: &str) -> DbResult<Vec<FileRecord>> {
        let owned = self
            .files
            .iter()
            .filter(|r| r.value().owner_wallet == owner)
            .map(|r| r.value().clone())
            .collect();
        Ok(Self::sorted_newest_first(owned))
    }

    async fn list_public_files(&self, limit: usize) -> DbResult<Vec<FileRecord>> {
        let public = self
            .files
            .iter()
            .filter(|r| r.value().is_public)
            .map(|r| r.value().clone())
            .collect();
        let mut sorted = Self::sorted_newest_first(public);
        sorted.truncate(limit);
        Ok(sorted)
    }

    async fn set_file_visibility(&self, id: &str, is_public: bool) -> DbResult<bool> {
        Ok(match self.files.get_mut(id) {
            Some(mut file) => {
                file.is_public = is_public;
                true
            }
            None => false,
        })
    }

    async fn delete_file(&self, id: &str) -> DbResult<()> {
        self.files.remove(id);
        Ok(())
    }

    async fn get_user(&self, wallet: &str) -> DbResult<Option<UserRecord>> {
        Ok(self.users.get(wallet).map(|r| r.value().clone()))
    }

    async fn get_or_create_user(&self, wallet: &str) -> DbResult<UserRecord> {
        Ok(self
            .users
            .entry(wallet.to_string())
            .or_insert_with(|| UserRecord::new(wallet))
            .value()
            .clone())
    }

    async fn set_user_tier(&self, wallet: &str, tier: Tier) -> DbResult<()> {
        if let Some(mut user) = self.users.get_mut(wallet) {
            user.tier = tier;
        }
        Ok(())
    }

    async fn adjust_storage_used(&self, wallet: &str, delta: i64) -> DbResult<u64> {
        Ok(match self.users.get_mut(wallet) {
            Some(mut user) => {
                user.total_storage_used = apply_delta(user.total_storage_used, delta);
                user.total_storage_used
            }
            None => 0,
        })
    }

    async fn is_payment_used(&self, signature: &str) -> DbResult<bool> {
        Ok(self.payments.contains_key(signature))
    }

    async fn claim_payment(&self, payment: UsedPayment) -> DbResult<ClaimOutcome> {
        Ok(match self.payments.entry(payment.tx_signature.clone()) {
            Entry::Occupied(_) => ClaimOutcome::AlreadyClaimed,
            Entry::Vacant(slot) => {
                slot.insert(payment);
                ClaimOutcome::Claimed
            }
        })
    }

    async fn redeem_payment(
        &self,
        signature: &str,
        min_amount: f64,
        action: &str,
    ) -> DbResult<RedeemOutcome> {
        // the shard write lock is held until `payment` drops
        let Some(mut payment) = self.payments.get_mut(signature) else {
            return Ok(RedeemOutcome::Unknown);
        };
        if payment.is_redeemed() {
            return Ok(RedeemOutcome::AlreadyRedeemed);
        }
        if payment.amount < min_amount {
            return Ok(RedeemOutcome::Underpaid {
                amount: payment.amount,
            });
        }
        payment.redeemed_at = Some(Utc::now());
        payment.redeemed_for = Some(action.to_string());
        Ok(RedeemOutcome::Redeemed)
    }

    async fn release_payment(&self, signature: &str) -> DbResult<()> {
        if let Some(mut payment) = self.payments.get_mut(signature) {
            payment.redeemed_at = None;
            payment.redeemed_for = None;
        }
        Ok(())
    }

    async fn recent_payments(&self, limit: usize) -> DbResult<Vec<UsedPayment>> {
        let mut payments: Vec<UsedPayment> =
            self.payments.iter().map(|r| r.value().clone()).collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        payments.truncate(limit);
        Ok(payments)
    }

    async fn flush(&self) -> DbResult<()> {
        self.save_to_file()?;
        Ok(())
    }
}
