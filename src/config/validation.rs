//! Configuration validation.
//!
//! Returns every problem found, not just the first, so an operator can fix
//! a config file in one pass. Runs before a config is accepted, both at
//! startup and on hot reload.

use std::net::SocketAddr;

use crate::blockchain::Pubkey;
use crate::config::schema::{
    AppConfig, DatabaseBackendKind, StorageBackendKind, TierConfig, TierLimits,
};

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address when metrics are enabled",
        ));
    }

    let mut rpc_urls = vec![&config.blockchain.rpc_url];
    rpc_urls.extend(config.blockchain.failover_urls.iter());
    for rpc_url in rpc_urls {
        if url::Url::parse(rpc_url).is_err() {
            errors.push(ValidationError::new(
                "blockchain.rpc_url",
                format!("'{}' is not a URL", rpc_url),
            ));
        }
    }
    if config.blockchain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be > 0"));
    }

    let payments = &config.payments;
    if !payments.wallet.is_empty() && payments.wallet.parse::<Pubkey>().is_err() {
        errors.push(ValidationError::new("payments.wallet", "not a base58 address"));
    }
    if !(payments.tolerance > 0.0 && payments.tolerance <= 1.0) {
        errors.push(ValidationError::new("payments.tolerance", "must be in (0, 1]"));
    }
    if payments.window_secs == 0 {
        errors.push(ValidationError::new("payments.window_secs", "must be > 0"));
    }
    if payments.signature_lookback == 0 || payments.signature_lookback > 1000 {
        errors.push(ValidationError::new(
            "payments.signature_lookback",
            "must be between 1 and 1000",
        ));
    }

    validate_tiers(&config.tiers, &mut errors);

    if config.mint.confirm_timeout_secs == 0 || config.mint.confirm_poll_ms == 0 {
        errors.push(ValidationError::new(
            "mint.confirm_timeout_secs",
            "timeout and poll interval must be > 0",
        ));
    }

    let fees = [
        ("mint.fee_sol", config.mint.fee_sol),
        ("files.onchain_fee_sol", config.files.onchain_fee_sol),
    ];
    for (field, fee) in fees {
        if !fee.is_finite() || fee < 0.0 {
            errors.push(ValidationError::new(field, "must be a non-negative SOL amount"));
        }
    }

    if url::Url::parse(&config.files.public_base_url).is_err() {
        errors.push(ValidationError::new("files.public_base_url", "not a URL"));
    }
    if config.files.explorer_limit == 0 {
        errors.push(ValidationError::new("files.explorer_limit", "must be > 0"));
    }

    let needs_supabase = config.storage.backend == StorageBackendKind::Supabase
        || config.database.backend == DatabaseBackendKind::Supabase;
    if needs_supabase {
        if url::Url::parse(&config.supabase.url).is_err() {
            errors.push(ValidationError::new(
                "supabase.url",
                "required when a supabase backend is selected",
            ));
        }
        if config.supabase.service_key.is_empty() {
            errors.push(ValidationError::new(
                "supabase.service_key",
                "required when a supabase backend is selected",
            ));
        }
    }
    if config.storage.backend == StorageBackendKind::Local && config.storage.local_root.is_empty() {
        errors.push(ValidationError::new("storage.local_root", "must not be empty"));
    }

    let largest_upload = [
        config.tiers.free.per_file_bytes,
        config.tiers.holder.per_file_bytes,
        config.tiers.whale.per_file_bytes,
        config.files.onchain_max_file_bytes,
    ]
    .into_iter()
    .max()
    .unwrap_or_default();
    if (config.security.max_body_size as u64) < largest_upload {
        errors.push(ValidationError::new(
            "security.max_body_size",
            "smaller than the largest per-file limit",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_tiers(tiers: &TierConfig, errors: &mut Vec<ValidationError>) {
    if !tiers.token_mint.is_empty() && tiers.token_mint.parse::<Pubkey>().is_err() {
        errors.push(ValidationError::new("tiers.token_mint", "not a base58 address"));
    }
    if tiers.holder_min < 0.0 || tiers.holder_min > tiers.whale_min {
        errors.push(ValidationError::new(
            "tiers.holder_min",
            "must be non-negative and not above tiers.whale_min",
        ));
    }
    let named: [(&'static str, &TierLimits); 3] = [
        ("tiers.free", &tiers.free),
        ("tiers.holder", &tiers.holder),
        ("tiers.whale", &tiers.whale),
    ];
    for (field, limits) in named {
        if limits.per_file_bytes == 0 || limits.per_file_bytes > limits.total_bytes {
            errors.push(ValidationError::new(
                field,
                "per_file_bytes must be > 0 and not above total_bytes",
            ));
        }
    }
}
