//! Liveness endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub version: &'static str,
    pub rpc: &'static str,
    /// Fee payer and authority for mints, when minting is enabled.
    #[serde(rename = "mintAuthority", skip_serializing_if = "Option::is_none")]
    pub mint_authority: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let rpc = if state.client.is_healthy().await {
        "ok"
    } else {
        "unreachable"
    };
    Json(HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        rpc,
        mint_authority: state.minter.as_ref().map(|m| m.authority().to_string()),
    })
}
