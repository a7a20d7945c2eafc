//! In-process snapshot store. Default backend when no `DATABASE_URL` is set.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{PriceSnapshot, SnapshotStore};
use crate::asset::AssetId;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    // Per-asset rows, oldest first.
    inner: RwLock<HashMap<AssetId, Vec<PriceSnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows across all assets.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .map(|m| m.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn append(&self, snapshot: PriceSnapshot) -> Result<(), StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::Persistence("memory store lock poisoned".into()))?;
        let rows = map.entry(snapshot.asset_id).or_default();
        // Keep rows ordered by observed_at; equal timestamps stay in insertion order.
        let at = rows.partition_point(|r| r.observed_at <= snapshot.observed_at);
        rows.insert(at, snapshot);
        Ok(())
    }

    async fn recent(&self, asset: AssetId, limit: usize) -> Result<Vec<PriceSnapshot>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Query("memory store lock poisoned".into()))?;
        let Some(rows) = map.get(&asset) else {
            return Ok(Vec::new());
        };

        Ok(rows.iter().rev().take(limit).cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
