//! Upload, listing, lookup and owner-gated file routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::MessageBody;
use crate::db::FileRecord;
use crate::files::{NewUpload, StorageType, UploadOutcome, WalletListing};
use crate::http::error::{ApiError, ApiResult};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    #[serde(default)]
    pub wallet: Option<String>,
}

impl WalletQuery {
    fn require(self) -> ApiResult<String> {
        self.wallet
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Wallet address required".to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct FileList {
    pub files: Vec<FileRecord>,
}

/// POST /api/upload
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadOutcome>> {
    let mut file = None;
    let mut wallet = None;
    let mut storage_type = None;
    let mut tx_signature = None;
    let mut payment_id = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await?;
                file = Some((file_name, content_type, data));
            }
            "wallet" => wallet = Some(field.text().await?),
            "storageType" => storage_type = Some(field.text().await?),
            "txSignature" => tx_signature = Some(field.text().await?),
            "paymentId" => payment_id = Some(field.text().await?),
            other => tracing::debug!(field = %other, "Ignoring unknown upload field"),
        }
    }

    let Some((file_name, content_type, data)) = file else {
        return Err(ApiError::BadRequest("No file provided".to_string()));
    };

    let upload = NewUpload {
        file_name,
        content_type,
        data,
        wallet,
        storage_type: StorageType::parse(storage_type.as_deref()),
        tx_signature,
        payment_id,
    };
    let config = state.config.load_full();
    Ok(Json(state.files.upload(&config, upload).await?))
}

/// GET /api/files?wallet=
pub async fn list_wallet_files(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> ApiResult<Json<WalletListing>> {
    let wallet = query.require()?;
    let config = state.config.load_full();
    Ok(Json(state.files.list_for_wallet(&config, &wallet).await?))
}

/// GET /api/file/{id}
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FileRecord>> {
    Ok(Json(state.files.get(&id).await?))
}

/// GET /api/f/{id}
pub async fn get_shared_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FileRecord>> {
    Ok(Json(state.files.resolve_share(&id).await?))
}

/// DELETE /api/file/{id}?wallet=
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<WalletQuery>,
) -> ApiResult<Json<MessageBody>> {
    let wallet = query.require()?;
    state.files.delete(&id, &wallet).await?;
    Ok(Json(MessageBody::new("File deleted successfully")))
}

/// GET /api/explorer
pub async fn explorer(State(state): State<AppState>) -> ApiResult<Json<FileList>> {
    let limit = state.config.load().files.explorer_limit;
    Ok(Json(FileList {
        files: state.files.explorer(limit).await?,
    }))
}

/// POST /api/update-public
///
/// `isPublic` must be a JSON boolean; anything else is a missing field.
pub async fn update_public(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<MessageBody>> {
    let missing = || ApiError::BadRequest("Missing required fields".to_string());
    let Json(body) = body.map_err(|_| missing())?;

    let non_empty = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let (Some(file_id), Some(wallet), Some(is_public)) = (
        non_empty("fileId"),
        non_empty("walletAddress"),
        body.get("isPublic").and_then(Value::as_bool),
    ) else {
        return Err(missing());
    };

    state.files.set_visibility(&file_id, &wallet, is_public).await?;
    Ok(Json(MessageBody::new("File visibility updated")))
}
