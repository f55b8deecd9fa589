//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request id, trace, timeout, limits)
//!     → handlers/ (extract, validate, call the owning service)
//!     → error.rs (service errors → status + JSON {error})
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{AppState, HttpServer};
