//! # Supabase Storage Backend
//!
//! Talks to the Storage REST API of a Supabase project with the service
//! role key. Objects are written with `x-upsert: false`.

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::json;

use super::backend::BlobStore;
use super::errors::{StorageError, StorageResult};
use super::validate_key;

#[derive(Clone)]
pub struct SupabaseStorage {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn new(http: reqwest::Client, base_url: &str, bucket: &str, service_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }
}

impl std::fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

/// Storage reports duplicates either as HTTP 409 or as a 400 whose body
/// carries `"statusCode":"409"`.
fn is_duplicate(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT
        || body.contains("\"statusCode\":\"409\"")
        || body.contains("already exists")
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        validate_key(path)?;
        let response = self
            .authorized(self.http.post(self.object_url(path)))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        if is_duplicate(status, &body) {
            return Err(StorageError::ObjectAlreadyExists(path.to_string()));
        }
        Err(StorageError::Upstream {
            status: status.as_u16(),
            message: body,
        })
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        validate_key(path)?;
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.http.delete(url))
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::ObjectNotFound(path.to_string()));
        }
        Err(StorageError::Upstream {
            status: status.as_u16(),
            message: body,
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    fn provider(&self) -> &'static str {
        "supabase"
    }
}
