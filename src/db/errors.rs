//! Metadata store errors.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// PostgREST answered with a non-success status.
    #[error("Database returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Database request failed: {0}")]
    Http(String),

    #[error("Failed to decode row: {0}")]
    Decode(String),

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DbError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DbError::Decode(e.to_string())
        } else {
            DbError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Decode(e.to_string())
    }
}
