//! JSON error responses.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::files::FilesError;
use crate::mint::MintError;
use crate::payments::PaymentError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PaymentRequired(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(e) => e.status(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let message = match &self {
            ApiError::Multipart(e) => e.body_text(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<FilesError> for ApiError {
    fn from(err: FilesError) -> Self {
        let message = err.to_string();
        match err {
            FilesError::NoFile
            | FilesError::TooLarge { .. }
            | FilesError::PaymentRequired
            | FilesError::QuotaExceeded
            | FilesError::InvalidWallet => ApiError::BadRequest(message),
            FilesError::Payment(e) if e.is_payment_required() => ApiError::PaymentRequired(message),
            FilesError::Payment(_) => ApiError::Internal(message),
            FilesError::NotFound => ApiError::NotFound(message),
            FilesError::Forbidden => ApiError::Forbidden(message),
            FilesError::Storage(_) | FilesError::Db(_) => ApiError::Internal(message),
        }
    }
}

impl From<MintError> for ApiError {
    fn from(err: MintError) -> Self {
        let message = err.to_string();
        match err {
            MintError::MissingRecipient | MintError::InvalidRecipient => {
                ApiError::BadRequest(message)
            }
            _ => ApiError::Internal(message),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            e if e.is_payment_required() => ApiError::PaymentRequired(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
