//! coinfile: token-gated file hosting with Solana payments and NFT minting.

pub mod blockchain;
pub mod config;
pub mod db;
pub mod files;
pub mod http;
pub mod lifecycle;
pub mod mint;
pub mod observability;
pub mod payments;
pub mod security;
pub mod storage;
pub mod tiers;

pub use config::schema::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
