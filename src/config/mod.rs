//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, apply env secrets)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via ArcSwap in AppState
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<AppConfig>
//!     → handlers observe new tiers, payment window, limits
//! ```
//!
//! Backend selection, bind address and RPC endpoints are read once at
//! startup; a reload only affects values that handlers read per request.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AppConfig;
pub use schema::{
    BlockchainConfig, DatabaseBackendKind, FilesConfig, ListenerConfig, MintConfig,
    PaymentConfig, StorageBackendKind, TierConfig, TierLimits,
};
