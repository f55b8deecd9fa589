//! NFT mint route.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::http::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::mint::{parse_recipient, MintRequest};
use crate::payments::{redeem_payment, release_payment, PaidAction};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub success: bool,
    pub mint_address: String,
    pub tx_signature: String,
    pub message: String,
}

/// POST /api/mint-nft
pub async fn mint_nft(
    State(state): State<AppState>,
    body: Result<Json<MintRequest>, JsonRejection>,
) -> ApiResult<Json<MintResponse>> {
    let Some(minter) = state.minter.as_ref() else {
        return Err(ApiError::Internal(
            "Minting not configured. Contact admin.".to_string(),
        ));
    };
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    parse_recipient(request.recipient_wallet.as_deref())?;

    let config = state.config.load_full();
    let redeemed = if config.mint.require_payment {
        Some(
            redeem_payment(
                state.store.as_ref(),
                request.tx_signature.as_deref(),
                config.mint.fee_sol,
                config.payments.tolerance,
                PaidAction::Mint,
            )
            .await?,
        )
    } else {
        None
    };

    let outcome = match minter.mint(&request, &config.files.public_base_url).await {
        Ok(outcome) => outcome,
        Err(err) => {
            match &redeemed {
                Some(signature) if err.is_before_broadcast() => {
                    release_payment(state.store.as_ref(), signature).await;
                }
                Some(signature) => {
                    tracing::warn!(signature = %signature, error = %err, "Mint failed after broadcast, payment stays redeemed");
                }
                None => {}
            }
            return Err(err.into());
        }
    };
    Ok(Json(MintResponse {
        success: true,
        mint_address: outcome.mint_address,
        tx_signature: outcome.tx_signature,
        message: "NFT minted successfully!".to_string(),
    }))
}
