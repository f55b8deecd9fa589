//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Root configuration for the file host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Solana RPC settings.
    pub blockchain: BlockchainConfig,

    /// Payment verification settings.
    pub payments: PaymentConfig,

    /// Token-gated quota tiers.
    pub tiers: TierConfig,

    /// NFT minting settings.
    pub mint: MintConfig,

    /// Upload and listing behaviour.
    pub files: FilesConfig,

    /// Object storage backend.
    pub storage: StorageConfig,

    /// Metadata row backend.
    pub database: DatabaseConfig,

    /// Hosted Supabase project (used by the `supabase` backends).
    pub supabase: SupabaseConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Minting waits on three confirmations, so this is generous.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 180 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Solana RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Commitment level used for reads and confirmations.
    pub commitment: String,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
            commitment: "confirmed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Receiving wallet for fees. Empty disables payment checks.
    pub wallet: String,

    /// How many recent signatures to scan per check.
    pub signature_lookback: usize,

    /// Trailing window in which a transaction counts as payment.
    pub window_secs: u64,

    /// Fraction of the expected amount that must arrive (fees, rounding).
    pub tolerance: f64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            wallet: String::new(),
            signature_lookback: 20,
            window_secs: 30 * 60,
            tolerance: 0.99,
        }
    }
}

/// Quota limits for one tier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct TierLimits {
    /// Total bytes a wallet may keep stored.
    pub total_bytes: u64,
    /// Largest single upload.
    pub per_file_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TierConfig {
    /// Mint of the gating token. Empty means every wallet is `free`.
    pub token_mint: String,

    /// Minimum balance for the `holder` tier.
    pub holder_min: f64,

    /// Minimum balance for the `whale` tier.
    pub whale_min: f64,

    pub free: TierLimits,
    pub holder: TierLimits,
    pub whale: TierLimits,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            token_mint: String::new(),
            holder_min: 1_000.0,
            whale_min: 10_000.0,
            free: TierLimits {
                total_bytes: 200 * MIB,
                per_file_bytes: 50 * MIB,
            },
            holder: TierLimits {
                total_bytes: GIB,
                per_file_bytes: 200 * MIB,
            },
            whale: TierLimits {
                total_bytes: 5 * GIB,
                per_file_bytes: 500 * MIB,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MintConfig {
    /// Require a claimed payment signature before minting.
    pub require_payment: bool,

    /// Mint price in SOL. The redeemed payment must cover it within
    /// `payments.tolerance`.
    pub fee_sol: f64,

    /// How long to wait for each mint transaction to confirm.
    pub confirm_timeout_secs: u64,

    /// Poll interval for signature status checks, in milliseconds.
    pub confirm_poll_ms: u64,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            require_payment: true,
            fee_sol: 0.01,
            confirm_timeout_secs: 60,
            confirm_poll_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Public origin of the site, used for share links.
    pub public_base_url: String,

    /// Maximum rows returned by the explorer.
    pub explorer_limit: usize,

    /// Per-file cap for on-chain storage.
    pub onchain_max_file_bytes: u64,

    /// Price in SOL of one on-chain upload.
    pub onchain_fee_sol: f64,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080".to_string(),
            explorer_limit: 100,
            onchain_max_file_bytes: MIB,
            onchain_fee_sol: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Supabase,
    #[default]
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,

    /// Bucket name (Supabase).
    pub bucket: String,

    /// Root directory for the local backend.
    pub local_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            bucket: "files".to_string(),
            local_root: "./data/blobs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackendKind {
    Supabase,
    #[default]
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackendKind,

    /// JSON snapshot file for the memory backend.
    pub persistence_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,

    /// Service role key. `COINFILE_SUPABASE_KEY` takes precedence.
    pub service_key: String,
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            // largest tier upload plus multipart overhead
            max_body_size: (501 * MIB) as usize,
        }
    }
}
