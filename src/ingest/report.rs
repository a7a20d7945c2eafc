// src/ingest/report.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::asset::AssetId;

/// Reason recorded when the provider answered without data for an asset.
pub const NO_DATA_REASON: &str = "no data received";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetOutcome {
    #[serde(rename = "coinId")]
    pub asset_id: AssetId,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AssetOutcome {
    pub fn success(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            status: OutcomeStatus::Success,
            reason: None,
        }
    }

    pub fn failure(asset_id: AssetId, reason: impl Into<String>) -> Self {
        Self {
            asset_id,
            status: OutcomeStatus::Failure,
            reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Result of one ingestion run: one outcome per configured asset, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<AssetOutcome>,
}

impl IngestionReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn outcome_for(&self, asset: AssetId) -> Option<&AssetOutcome> {
        self.outcomes.iter().find(|o| o.asset_id == asset)
    }
}
