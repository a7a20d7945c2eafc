// src/asset.rs
//! Closed set of assets the tracker knows how to price.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provider-side identifier of a supported asset.
///
/// Anything outside this enum is rejected wherever an asset id enters the
/// system (config, query params, ingestion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetId {
    #[serde(rename = "bitcoin")]
    Bitcoin,
    #[serde(rename = "matic-network")]
    MaticNetwork,
    #[serde(rename = "ethereum")]
    Ethereum,
}

impl AssetId {
    /// Declaration order; also the default ingestion order.
    pub const ALL: [AssetId; 3] = [AssetId::Bitcoin, AssetId::MaticNetwork, AssetId::Ethereum];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetId::Bitcoin => "bitcoin",
            AssetId::MaticNetwork => "matic-network",
            AssetId::Ethereum => "ethereum",
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported asset id: '{0}'")]
pub struct UnknownAsset(pub String);

impl FromStr for AssetId {
    type Err = UnknownAsset;

    /// Exact match on the provider id; no case folding, no aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetId::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAsset(s.to_string()))
    }
}

/// Parse a comma-separated list such as `bitcoin,ethereum`.
/// Blank items are skipped; duplicates keep their first position.
pub fn parse_asset_list(raw: &str) -> Result<Vec<AssetId>, UnknownAsset> {
    let mut out = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id: AssetId = item.parse()?;
        if !out.contains(&id) {
            out.push(id);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_ids_only() {
        assert_eq!("bitcoin".parse::<AssetId>(), Ok(AssetId::Bitcoin));
        assert_eq!("matic-network".parse::<AssetId>(), Ok(AssetId::MaticNetwork));
        assert!("BITCOIN".parse::<AssetId>().is_err());
        assert!("dogecoin".parse::<AssetId>().is_err());
    }

    #[test]
    fn list_keeps_order_and_drops_dupes() {
        let v = parse_asset_list(" ethereum, bitcoin,,ethereum ").unwrap();
        assert_eq!(v, vec![AssetId::Ethereum, AssetId::Bitcoin]);
        assert!(parse_asset_list("bitcoin,solana").is_err());
    }

    #[test]
    fn serde_uses_provider_ids() {
        let s = serde_json::to_string(&AssetId::MaticNetwork).unwrap();
        assert_eq!(s, r#""matic-network""#);
        let back: AssetId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, AssetId::MaticNetwork);
    }
}
