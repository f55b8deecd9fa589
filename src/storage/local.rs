//! # Local Directory Backend

use async_trait::async_trait;
use axum::body::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use super::backend::BlobStore;
use super::errors::{StorageError, StorageResult};
use super::validate_key;

/// Stores blobs under a root directory. The HTTP server exposes the same
/// directory at `public_base`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    fn full_path(&self, path: &str) -> StorageResult<PathBuf> {
        validate_key(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let full = self.full_path(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::ObjectAlreadyExists(path.to_string()),
                _ => StorageError::from(e),
            })?;
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full = self.full_path(path)?;
        tokio::fs::remove_file(&full).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::ObjectNotFound(path.to_string()),
            _ => StorageError::from(e),
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path)
    }

    fn provider(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost:8080/blobs/");

        store
            .put("anonymous/abc.txt", Bytes::from_static(b"hello"), "text/plain")
            .await
            .unwrap();
        let on_disk = std::fs::read(dir.path().join("anonymous/abc.txt")).unwrap();
        assert_eq!(on_disk, b"hello");
        assert_eq!(
            store.public_url("anonymous/abc.txt"),
            "http://localhost:8080/blobs/anonymous/abc.txt"
        );

        store.delete("anonymous/abc.txt").await.unwrap();
        assert!(matches!(
            store.delete("anonymous/abc.txt").await,
            Err(StorageError::ObjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_no_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://x");
        store.put("a/b", Bytes::from_static(b"1"), "x").await.unwrap();
        let err = store.put("a/b", Bytes::from_static(b"2"), "x").await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectAlreadyExists(_)));
        assert_eq!(std::fs::read(dir.path().join("a/b")).unwrap(), b"1");
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://x");
        let err = store
            .put("../escape", Bytes::from_static(b"x"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }
}
