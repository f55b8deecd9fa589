//! Uploads, listings, lookups and owner-gated file mutations.

pub mod ids;
pub mod service;

use thiserror::Error;

use crate::db::DbError;
use crate::payments::PaymentError;
use crate::storage::StorageError;

pub use ids::{file_extension, generate_short_id, object_key};
pub use service::{FileService, NewUpload, StorageType, UploadOutcome, WalletListing};

#[derive(Debug, Error)]
pub enum FilesError {
    #[error("No file provided")]
    NoFile,

    #[error("File too large. Max size for {storage_type}: {max_mb}MB")]
    TooLarge { storage_type: String, max_mb: f64 },

    #[error("Payment required for on-chain storage")]
    PaymentRequired,

    /// The presented payment cannot be redeemed for this upload.
    #[error("{0}")]
    Payment(PaymentError),

    #[error("Invalid wallet address")]
    InvalidWallet,

    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("File not found")]
    NotFound,

    #[error("Unauthorized")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

impl From<PaymentError> for FilesError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::Ledger(db) => FilesError::Db(db),
            other => FilesError::Payment(other),
        }
    }
}

pub type FilesResult<T> = Result<T, FilesError>;
