// src/lib.rs
// Public library surface shared by both binaries and the integration tests.

pub mod api;
pub mod asset;
pub mod channel;
pub mod config;
pub mod consumer;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod provider;
pub mod scheduler;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::asset::AssetId;
pub use crate::ingest::{IngestionReport, IngestionService};

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::provider::{CoinGeckoProvider, PriceProvider};
use crate::store::{MemoryStore, SnapshotStore, SqliteStore};

/// Pick the snapshot backend from config: SQLite when `database_url` is set.
pub async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn SnapshotStore>> {
    match &cfg.database_url {
        Some(url) => {
            let store = SqliteStore::connect(url)
                .await
                .context("opening snapshot database")?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Wire provider + store into an ingestion service for the configured assets.
pub async fn build_ingestion(cfg: &AppConfig) -> Result<(Arc<IngestionService>, Arc<dyn SnapshotStore>)> {
    let provider: Arc<dyn PriceProvider> = Arc::new(
        CoinGeckoProvider::new(cfg.provider_base_url.clone(), cfg.provider_timeout)
            .context("building price provider")?,
    );
    let store = build_store(cfg).await?;
    let ingestion = Arc::new(IngestionService::new(
        provider,
        Arc::clone(&store),
        cfg.assets.clone(),
    ));
    Ok((ingestion, store))
}
