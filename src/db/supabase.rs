//! PostgREST-backed metadata store on a hosted Supabase project.
//!
//! Tables: `files`, `users`, `used_payments`. The `used_payments.tx_signature`
//! column carries a unique constraint; a 409 on insert is how a claim loses.
//! Redemption is a conditional `PATCH` filtered on `redeemed_at=is.null`, so
//! only one request gets the row back.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::errors::{DbError, DbResult};
use super::models::{FileRecord, UsedPayment, UserRecord};
use super::store::{apply_delta, ClaimOutcome, RecordStore, RedeemOutcome};
use crate::tiers::Tier;

#[derive(Clone)]
pub struct SupabaseDb {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseDb {
    pub fn new(http: reqwest::Client, base_url: &str, service_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> DbResult<Vec<T>> {
        let response = self
            .authorized(self.http.get(self.table_url(table)))
            .query(query)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> DbResult<Option<T>> {
        let mut query = query.to_vec();
        query.push(("limit", "1".to_string()));
        Ok(self.select(table, &query).await?.into_iter().next())
    }

    /// Insert one row. Returns the raw response so callers can inspect 409s.
    async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> DbResult<Response> {
        Ok(self
            .authorized(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?)
    }

    async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        patch: serde_json::Value,
    ) -> DbResult<Vec<T>> {
        let response = self
            .authorized(self.http.patch(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(query)
            .json(&patch)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

impl std::fmt::Debug for SupabaseDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseDb")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

async fn check(response: Response) -> DbResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(DbError::Upstream {
        status: status.as_u16(),
        message,
    })
}

async fn first_row<T: DeserializeOwned>(response: Response) -> DbResult<T> {
    let rows: Vec<T> = check(response).await?.json().await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::Decode("insert returned no rows".to_string()))
}

#[async_trait]
impl RecordStore for SupabaseDb {
    async fn insert_file(&self, file: FileRecord) -> DbResult<FileRecord> {
        let response = self.insert("files", &file).await?;
        first_row(response).await
    }

    async fn get_file(&self, id: &str) -> DbResult<Option<FileRecord>> {
        self.select_one("files", &[("id", eq(id))]).await
    }

    async fn get_file_by_short_id(&self, short_id: &str) -> DbResult<Option<FileRecord>> {
        self.select_one("files", &[("short_id", eq(short_id))]).await
    }

    async fn list_files_by_owner(&self, owner: &str) -> DbResult<Vec<FileRecord>> {
        self.select(
            "files",
            &[
                ("owner_wallet", eq(owner)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn list_public_files(&self, limit: usize) -> DbResult<Vec<FileRecord>> {
        self.select(
            "files",
            &[
                ("is_public", "eq.true".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn set_file_visibility(&self, id: &str, is_public: bool) -> DbResult<bool> {
        let rows: Vec<FileRecord> = self
            .update("files", &[("id", eq(id))], json!({ "is_public": is_public }))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn delete_file(&self, id: &str) -> DbResult<()> {
        let response = self
            .authorized(self.http.delete(self.table_url("files")))
            .query(&[("id", eq(id))])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn get_user(&self, wallet: &str) -> DbResult<Option<UserRecord>> {
        self.select_one("users", &[("wallet_address", eq(wallet))])
            .await
    }

    async fn get_or_create_user(&self, wallet: &str) -> DbResult<UserRecord> {
        if let Some(user) = self.get_user(wallet).await? {
            return Ok(user);
        }
        let response = self.insert("users", &UserRecord::new(wallet)).await?;
        if response.status() == StatusCode::CONFLICT {
            // lost a creation race; the winner's row is authoritative
            return self
                .get_user(wallet)
                .await?
                .ok_or_else(|| DbError::Decode(format!("user {wallet} vanished after conflict")));
        }
        first_row(response).await
    }

    async fn set_user_tier(&self, wallet: &str, tier: Tier) -> DbResult<()> {
        let _: Vec<UserRecord> = self
            .update(
                "users",
                &[("wallet_address", eq(wallet))],
                json!({ "tier": tier }),
            )
            .await?;
        Ok(())
    }

    async fn adjust_storage_used(&self, wallet: &str, delta: i64) -> DbResult<u64> {
        // TODO: move to an RPC function so the read-modify-write happens in one statement
        let Some(user) = self.get_user(wallet).await? else {
            return Ok(0);
        };
        let total = apply_delta(user.total_storage_used, delta);
        let _: Vec<UserRecord> = self
            .update(
                "users",
                &[("wallet_address", eq(wallet))],
                json!({ "total_storage_used": total }),
            )
            .await?;
        Ok(total)
    }

    async fn is_payment_used(&self, signature: &str) -> DbResult<bool> {
        let row: Option<UsedPayment> = self
            .select_one("used_payments", &[("tx_signature", eq(signature))])
            .await?;
        Ok(row.is_some())
    }

    async fn claim_payment(&self, payment: UsedPayment) -> DbResult<ClaimOutcome> {
        let response = self.insert("used_payments", &payment).await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }
        check(response).await?;
        Ok(ClaimOutcome::Claimed)
    }

    async fn redeem_payment(
        &self,
        signature: &str,
        min_amount: f64,
        action: &str,
    ) -> DbResult<RedeemOutcome> {
        let rows: Vec<UsedPayment> = self
            .update(
                "used_payments",
                &[
                    ("tx_signature", eq(signature)),
                    ("redeemed_at", "is.null".to_string()),
                    ("amount", format!("gte.{min_amount}")),
                ],
                json!({ "redeemed_at": Utc::now(), "redeemed_for": action }),
            )
            .await?;
        if !rows.is_empty() {
            return Ok(RedeemOutcome::Redeemed);
        }

        let row: Option<UsedPayment> = self
            .select_one("used_payments", &[("tx_signature", eq(signature))])
            .await?;
        Ok(match row {
            None => RedeemOutcome::Unknown,
            Some(payment) if payment.is_redeemed() => RedeemOutcome::AlreadyRedeemed,
            Some(payment) => RedeemOutcome::Underpaid {
                amount: payment.amount,
            },
        })
    }

    async fn release_payment(&self, signature: &str) -> DbResult<()> {
        let _: Vec<UsedPayment> = self
            .update(
                "used_payments",
                &[("tx_signature", eq(signature))],
                json!({ "redeemed_at": null, "redeemed_for": null }),
            )
            .await?;
        Ok(())
    }

    async fn recent_payments(&self, limit: usize) -> DbResult<Vec<UsedPayment>> {
        self.select(
            "used_payments",
            &[
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }
}
