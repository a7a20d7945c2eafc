//! SQLite-backed snapshot store, selected when `DATABASE_URL` is set.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use super::{PriceSnapshot, SnapshotStore};
use crate::asset::AssetId;
use crate::error::StoreError;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `db_url` and ensure the schema.
    pub async fn connect(db_url: &str) -> Result<Self> {
        let in_memory = db_url.contains(":memory:");

        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent() {
                if !in_memory && !parent.as_os_str().is_empty() && !parent.exists() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .context("creating database directory")?;
                }
            }
        }

        let mut options = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("parsing database url {db_url}"))?
            .create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = pool_options(in_memory)
            .connect_with(options)
            .await
            .context("connecting to SQLite database")?;

        info!(target: "store", url = db_url, "connected to snapshot database");

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset_id TEXT NOT NULL,
                price_usd REAL NOT NULL,
                market_cap_usd REAL NOT NULL,
                change_24h_pct REAL NOT NULL,
                observed_at_ms INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating price_snapshots table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_snapshots_asset_time
            ON price_snapshots (asset_id, observed_at_ms DESC, id DESC);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating price_snapshots index")?;

        Ok(())
    }
}

/// Each in-memory connection is its own database, so an in-memory pool holds
/// exactly one connection and never retires it.
fn pool_options(in_memory: bool) -> SqlitePoolOptions {
    if in_memory {
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn append(&self, snapshot: PriceSnapshot) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO price_snapshots
            (asset_id, price_usd, market_cap_usd, change_24h_pct, observed_at_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.asset_id.as_str())
        .bind(snapshot.price_usd)
        .bind(snapshot.market_cap_usd)
        .bind(snapshot.change_24h_pct)
        .bind(snapshot.observed_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn recent(&self, asset: AssetId, limit: usize) -> Result<Vec<PriceSnapshot>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT asset_id, price_usd, market_cap_usd, change_24h_pct, observed_at_ms
            FROM price_snapshots
            WHERE asset_id = ?
            ORDER BY observed_at_ms DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(asset.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let asset_raw: String = row.try_get("asset_id")?;
            let asset_id = asset_raw
                .parse::<AssetId>()
                .map_err(|e| StoreError::Query(e.to_string()))?;
            let ms: i64 = row.try_get("observed_at_ms")?;
            let observed_at = DateTime::<Utc>::from_timestamp_millis(ms)
                .ok_or_else(|| StoreError::Query(format!("bad timestamp {ms}")))?;
            out.push(PriceSnapshot {
                asset_id,
                price_usd: row.try_get("price_usd")?,
                market_cap_usd: row.try_get("market_cap_usd")?,
                change_24h_pct: row.try_get("change_24h_pct")?,
                observed_at,
            });
        }
        Ok(out)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
