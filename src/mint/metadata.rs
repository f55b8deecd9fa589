//! Off-chain NFT metadata document.

use serde::Deserialize;
use serde_json::{json, Value};

use super::instructions::MAX_NAME_LEN;

pub const SYMBOL: &str = "FILE";

const TRUNCATED_NAME_LEN: usize = MAX_NAME_LEN - 3;

/// Body of `POST /api/mint-nft`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: f64,
    #[serde(default)]
    pub recipient_wallet: Option<String>,
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub tx_signature: Option<String>,
}

impl MintRequest {
    pub fn size_bytes(&self) -> u64 {
        if self.file_size.is_finite() && self.file_size > 0.0 {
            self.file_size as u64
        } else {
            0
        }
    }
}

/// On-chain token name: names over 32 bytes are cut to 29 bytes (on a
/// char boundary) plus `...`.
pub fn token_name(file_name: &str) -> String {
    if file_name.len() <= MAX_NAME_LEN {
        return file_name.to_string();
    }
    let mut name = String::with_capacity(MAX_NAME_LEN);
    for c in file_name.chars() {
        if name.len() + c.len_utf8() > TRUNCATED_NAME_LEN {
            break;
        }
        name.push(c);
    }
    name.push_str("...");
    name
}

/// Human-readable size: base 1024, at most two decimals, trailing zeros dropped.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Metadata JSON for the token URI.
pub fn metadata_document(request: &MintRequest, public_base_url: &str) -> Value {
    let size = format_bytes(request.size_bytes());
    json!({
        "name": token_name(&request.file_name),
        "symbol": SYMBOL,
        "description": format!("File stored on coinfile. Size: {size}"),
        "image": request.file_url,
        "external_url": format!("{}/f/{}", public_base_url.trim_end_matches('/'), request.short_id),
        "attributes": [
            { "trait_type": "File Name", "value": request.file_name },
            { "trait_type": "File Size", "value": size },
            { "trait_type": "Storage", "value": "Permanent" },
            { "trait_type": "Platform", "value": "coinfile" }
        ],
        "properties": {
            "files": [{ "uri": request.file_url, "type": "application/octet-stream" }],
            "category": "file"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_name_truncation() {
        assert_eq!(token_name("short.txt"), "short.txt");
        let exact = "a".repeat(32);
        assert_eq!(token_name(&exact), exact);
        let long = "b".repeat(33);
        let name = token_name(&long);
        assert_eq!(name, format!("{}...", "b".repeat(29)));
        assert_eq!(name.len(), 32);
    }

    #[test]
    fn test_token_name_multibyte_stays_within_limit() {
        let long = "é".repeat(20);
        let name = token_name(&long);
        assert!(name.len() <= 32);
        assert!(name.ends_with("..."));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(500), "500 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_bytes(1_234_567), "1.18 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 * 1024), "3072 GB");
    }

    #[test]
    fn test_metadata_document() {
        let request = MintRequest {
            file_url: "https://cdn/x.png".into(),
            file_name: "x.png".into(),
            file_size: 2048.0,
            short_id: "abcd1234".into(),
            ..MintRequest::default()
        };
        let doc = metadata_document(&request, "https://coinfile.fun/");
        assert_eq!(doc["symbol"], "FILE");
        assert_eq!(doc["external_url"], "https://coinfile.fun/f/abcd1234");
        assert_eq!(doc["attributes"][1]["value"], "2 KB");
        assert_eq!(doc["properties"]["files"][0]["uri"], "https://cdn/x.png");
    }
}
