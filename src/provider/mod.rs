// src/provider/mod.rs
pub mod coingecko;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::asset::AssetId;
use crate::error::ProviderError;

pub use coingecko::CoinGeckoProvider;

/// Spot quote in USD as reported by the upstream API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub change_24h_pct: f64,
}

/// Source of current quotes. Implementations do not retry; a missing entry is
/// "not found", while `Err` means the upstream call itself did not complete.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Quotes for every requested asset the upstream knows about.
    async fn fetch_many(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, PriceQuote>, ProviderError>;

    /// `Ok(None)` when the upstream answered without data for `asset`.
    async fn fetch_one(&self, asset: AssetId) -> Result<Option<PriceQuote>, ProviderError> {
        let mut quotes = self.fetch_many(&[asset]).await?;
        Ok(quotes.remove(&asset))
    }

    fn name(&self) -> &'static str;
}
