// src/ingest/mod.rs
pub mod report;

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use tokio::sync::Mutex;

use crate::asset::AssetId;
use crate::provider::PriceProvider;
use crate::store::{PriceSnapshot, SnapshotStore};

pub use report::{AssetOutcome, IngestionReport, OutcomeStatus, NO_DATA_REASON};

/// Fetch-and-persist over a fixed asset list.
///
/// Plain callable with no transport knowledge; the trigger consumer and the
/// HTTP store endpoint both call [`IngestionService::run_ingestion`].
pub struct IngestionService {
    provider: Arc<dyn PriceProvider>,
    store: Arc<dyn SnapshotStore>,
    assets: Vec<AssetId>,
    // Serializes runs inside one process.
    run_lock: Mutex<()>,
}

impl IngestionService {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        store: Arc<dyn SnapshotStore>,
        assets: Vec<AssetId>,
    ) -> Self {
        Self {
            provider,
            store,
            assets,
            run_lock: Mutex::new(()),
        }
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    /// Run once across all configured assets, sequentially and in order.
    ///
    /// A failing asset is recorded and the run moves on; the report always has
    /// exactly one outcome per configured asset. A run started while another
    /// is in flight waits for it to finish.
    pub async fn run_ingestion(&self) -> IngestionReport {
        crate::metrics::describe_all();
        let _guard = self.run_lock.lock().await;

        let started_at = Utc::now();
        let t0 = std::time::Instant::now();
        tracing::info!(
            target: "ingest",
            provider = self.provider.name(),
            store = self.store.backend(),
            assets = self.assets.len(),
            "ingestion run started"
        );

        let mut outcomes = Vec::with_capacity(self.assets.len());
        for &asset in &self.assets {
            let outcome = self.ingest_one(asset).await;
            if outcome.is_success() {
                counter!("ingest_asset_success_total", "asset" => asset.as_str()).increment(1);
            } else {
                counter!("ingest_asset_failures_total", "asset" => asset.as_str()).increment(1);
            }
            outcomes.push(outcome);
        }

        let report = IngestionReport {
            started_at,
            outcomes,
        };

        counter!("ingest_runs_total").increment(1);
        histogram!("ingest_run_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("ingest_last_run_ts").set(started_at.timestamp() as f64);
        tracing::info!(
            target: "ingest",
            succeeded = report.succeeded(),
            failed = report.failed(),
            "ingestion run finished"
        );
        report
    }

    async fn ingest_one(&self, asset: AssetId) -> AssetOutcome {
        let quote = match self.provider.fetch_one(asset).await {
            Ok(Some(q)) => q,
            Ok(None) => {
                tracing::warn!(target: "ingest", asset = %asset, "no data received");
                return AssetOutcome::failure(asset, NO_DATA_REASON);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", asset = %asset, error = %e, "provider fetch failed");
                return AssetOutcome::failure(asset, e.to_string());
            }
        };

        let snapshot = PriceSnapshot::from_quote(asset, quote, Utc::now());
        match self.store.append(snapshot).await {
            Ok(()) => {
                tracing::debug!(target: "ingest", asset = %asset, price = quote.price_usd, "snapshot stored");
                AssetOutcome::success(asset)
            }
            Err(e) => {
                tracing::error!(target: "ingest", asset = %asset, error = %e, "snapshot append failed");
                AssetOutcome::failure(asset, e.to_string())
            }
        }
    }
}
