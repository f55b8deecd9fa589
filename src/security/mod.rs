//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → body limit (DefaultBodyLimit, security.max_body_size)
//!     → handler
//!     → headers.rs (security response headers)
//! ```
//!
//! Wallet addresses are self-reported; ownership checks compare the
//! supplied wallet with the row's owner and nothing more.

pub mod headers;
