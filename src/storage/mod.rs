//! Object storage for uploaded file bytes.
//!
//! Two interchangeable backends sit behind [`BlobStore`]:
//! - `supabase`: Supabase Storage REST API (hosted deployments)
//! - `local`: a directory on disk, served back under `/blobs` (development, tests)

pub mod backend;
pub mod errors;
pub mod local;
pub mod supabase;

pub use backend::BlobStore;
pub use errors::{StorageError, StorageResult};
pub use local::LocalBlobStore;
pub use supabase::SupabaseStorage;

/// Reject keys that could escape the bucket or root directory.
pub fn validate_key(path: &str) -> StorageResult<()> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}
