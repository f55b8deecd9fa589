//! Route handlers.

pub mod files;
pub mod health;
pub mod mint;
pub mod payments;

use serde::Serialize;

/// `{message}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
