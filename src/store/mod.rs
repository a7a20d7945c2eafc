// src/store/mod.rs
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::asset::AssetId;
use crate::error::StoreError;
use crate::provider::PriceQuote;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// One recorded observation. Never mutated after it is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSnapshot {
    pub asset_id: AssetId,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub change_24h_pct: f64,
    pub observed_at: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn from_quote(asset_id: AssetId, quote: PriceQuote, observed_at: DateTime<Utc>) -> Self {
        Self {
            asset_id,
            price_usd: quote.price_usd,
            market_cap_usd: quote.market_cap_usd,
            change_24h_pct: quote.change_24h_pct,
            observed_at,
        }
    }
}

/// Append-only per-asset time series.
///
/// `recent` is ordered by `observed_at` descending; equal timestamps come back
/// in reverse insertion order. It never returns more than `limit` rows and
/// never rows of another asset.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn append(&self, snapshot: PriceSnapshot) -> Result<(), StoreError>;

    async fn recent(&self, asset: AssetId, limit: usize) -> Result<Vec<PriceSnapshot>, StoreError>;

    async fn latest(&self, asset: AssetId) -> Result<Option<PriceSnapshot>, StoreError> {
        Ok(self.recent(asset, 1).await?.into_iter().next())
    }

    fn backend(&self) -> &'static str;
}
