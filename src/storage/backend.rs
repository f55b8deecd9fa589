//! # Storage Backend Trait

use async_trait::async_trait;
use axum::body::Bytes;

use super::errors::StorageResult;

/// Backend trait for blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Write a new object. Existing objects are never overwritten.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Remove an object.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Publicly reachable URL for an object.
    fn public_url(&self, path: &str) -> String;

    /// Backend tag recorded on file rows.
    fn provider(&self) -> &'static str;
}
