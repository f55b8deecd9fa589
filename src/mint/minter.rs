//! Builds, signs and confirms the mint transactions.

use axum::body::Bytes;
use std::sync::Arc;

use crate::blockchain::programs::TOKEN;
use crate::blockchain::{Instruction, Keypair, Pubkey, Transaction, TxSubmitter};
use crate::observability::metrics;
use crate::storage::BlobStore;

use super::instructions::{
    create_account, create_associated_token_account_idempotent, create_metadata_account_v3,
    associated_token_address, initialize_mint2, mint_to, set_mint_authority, TokenMetadata,
    MAX_URI_LEN, MINT_ACCOUNT_LEN,
};
use super::metadata::{metadata_document, token_name, MintRequest, SYMBOL};
use super::{MintError, MintResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome {
    pub mint_address: String,
    /// Signature of the delivery transaction.
    pub tx_signature: String,
}

/// Mints one-of-one tokens with the platform key as payer and authority.
#[derive(Clone)]
pub struct NftMinter {
    authority: Arc<Keypair>,
    submitter: TxSubmitter,
    blobs: Arc<dyn BlobStore>,
}

impl NftMinter {
    pub fn new(authority: Arc<Keypair>, submitter: TxSubmitter, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            authority,
            submitter,
            blobs,
        }
    }

    pub fn authority(&self) -> Pubkey {
        self.authority.pubkey()
    }

    /// Mint `request` to its recipient.
    pub async fn mint(&self, request: &MintRequest, public_base_url: &str) -> MintResult<MintOutcome> {
        let result = self.mint_inner(request, public_base_url).await;
        metrics::record_mint(if result.is_ok() { "success" } else { "failure" });
        result
    }

    async fn mint_inner(&self, request: &MintRequest, public_base_url: &str) -> MintResult<MintOutcome> {
        let recipient = parse_recipient(request.recipient_wallet.as_deref())?;
        let mint = Keypair::generate();
        let mint_key = mint.pubkey();
        let payer = self.authority.pubkey();

        let uri = self.store_metadata(request, public_base_url, &mint_key).await?;
        tracing::info!(mint = %mint_key, recipient = %recipient, uri = %uri, "Minting file NFT");

        let client = self.submitter.client();

        let rent = client
            .get_minimum_balance_for_rent_exemption(MINT_ACCOUNT_LEN as usize)
            .await?;
        let create_mint = [
            create_account(&payer, &mint_key, rent, MINT_ACCOUNT_LEN, &TOKEN),
            initialize_mint2(&mint_key, 0, &payer, Some(&payer)),
        ];
        let token = TokenMetadata {
            name: token_name(&request.file_name),
            symbol: SYMBOL.to_string(),
            uri,
            seller_fee_basis_points: 0,
        };
        let attach = [create_metadata_account_v3(&mint_key, &payer, &payer, &token)?];
        let destination = associated_token_address(&recipient, &mint_key)?;
        let deliver = [
            create_associated_token_account_idempotent(&payer, &recipient, &mint_key)?,
            mint_to(&mint_key, &destination, &payer, 1),
            set_mint_authority(&mint_key, &payer, None),
        ];

        let signature = self.submit(&create_mint, &[&mint]).await?;
        tracing::debug!(signature = %signature, "Mint account created");

        let tx_signature = async {
            let signature = self.submit(&attach, &[]).await?;
            tracing::debug!(signature = %signature, "Metadata attached");
            let signature = self.submit(&deliver, &[]).await?;
            Ok::<_, MintError>(signature)
        }
        .await
        .map_err(MintError::after_broadcast)?;

        tracing::info!(mint = %mint_key, signature = %tx_signature, "NFT minted");
        Ok(MintOutcome {
            mint_address: mint_key.to_string(),
            tx_signature,
        })
    }

    /// Store the metadata document and return its public URL.
    async fn store_metadata(
        &self,
        request: &MintRequest,
        public_base_url: &str,
        mint: &Pubkey,
    ) -> MintResult<String> {
        let path = metadata_path(&request.short_id, mint);
        let uri = self.blobs.public_url(&path);
        if uri.len() > MAX_URI_LEN {
            return Err(MintError::UriTooLong(uri.len()));
        }

        let document = metadata_document(request, public_base_url);
        let body = serde_json::to_vec(&document)?;
        self.blobs
            .put(&path, Bytes::from(body), "application/json")
            .await?;
        Ok(uri)
    }

    async fn submit(&self, instructions: &[Instruction], signers: &[&Keypair]) -> MintResult<String> {
        let blockhash = self.submitter.client().get_latest_blockhash().await?;
        let tx = Transaction::new_signed(instructions, &self.authority, signers, blockhash)?;
        self.submitter
            .send_and_confirm(&tx)
            .await
            .map_err(|e| MintError::from(e).after_broadcast())
    }
}

impl std::fmt::Debug for NftMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NftMinter")
            .field("authority", &self.authority.pubkey())
            .finish_non_exhaustive()
    }
}

pub fn parse_recipient(recipient: Option<&str>) -> MintResult<Pubkey> {
    match recipient.map(str::trim).filter(|r| !r.is_empty()) {
        None => Err(MintError::MissingRecipient),
        Some(r) => r.parse().map_err(|_| MintError::InvalidRecipient),
    }
}

/// `metadata/<shortId>-<mint>.json`; the short id is reduced to
/// alphanumerics and dropped when nothing remains.
fn metadata_path(short_id: &str, mint: &Pubkey) -> String {
    let short: String = short_id.chars().filter(char::is_ascii_alphanumeric).collect();
    if short.is_empty() {
        format!("metadata/{mint}.json")
    } else {
        format!("metadata/{short}-{mint}.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipient() {
        assert!(matches!(parse_recipient(None), Err(MintError::MissingRecipient)));
        assert!(matches!(parse_recipient(Some("  ")), Err(MintError::MissingRecipient)));
        assert!(matches!(
            parse_recipient(Some("not-base58!")),
            Err(MintError::InvalidRecipient)
        ));
        let key = parse_recipient(Some("US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx")).unwrap();
        assert_eq!(key, Pubkey::new([7; 32]));
    }

    #[test]
    fn test_metadata_path() {
        let mint = Pubkey::new([7; 32]);
        assert_eq!(
            metadata_path("abcd1234", &mint),
            "metadata/abcd1234-US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx.json"
        );
        assert_eq!(
            metadata_path("../", &mint),
            "metadata/US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx.json"
        );
    }
}
