use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::asset::AssetId;
use crate::ingest::{AssetOutcome, IngestionService};
use crate::stats::{round2, standard_deviation};
use crate::store::SnapshotStore;

#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub store: Arc<dyn SnapshotStore>,
    /// How many recent snapshots `/api/deviation` looks at.
    pub deviation_window: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/stats", get(get_stats))
        .route("/api/stats/store", post(store_stats))
        .route("/api/deviation", get(get_deviation))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct CoinQuery {
    #[serde(alias = "coinId")]
    coin: Option<String>,
}

impl CoinQuery {
    fn asset(&self) -> Result<AssetId, ApiError> {
        self.coin
            .as_deref()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| ApiError::BadRequest("Invalid or missing 'coin' parameter".into()))
    }
}

#[derive(Serialize)]
struct StatsOut {
    price: f64,
    #[serde(rename = "marketCap")]
    market_cap: f64,
    #[serde(rename = "24hChange")]
    change_24h: f64,
}

async fn get_stats(
    State(state): State<AppState>,
    Query(q): Query<CoinQuery>,
) -> Result<Json<StatsOut>, ApiError> {
    let asset = q.asset()?;
    let snap = state
        .store
        .latest(asset)
        .await
        .map_err(|e| {
            tracing::error!(target: "api", asset = %asset, error = %e, "latest snapshot query failed");
            ApiError::Internal("Failed to fetch coin data".into())
        })?
        .ok_or_else(|| ApiError::NotFound("Coin data not found".into()))?;

    Ok(Json(StatsOut {
        price: snap.price_usd,
        market_cap: snap.market_cap_usd,
        change_24h: snap.change_24h_pct,
    }))
}

#[derive(Serialize)]
struct DeviationOut {
    deviation: f64,
}

async fn get_deviation(
    State(state): State<AppState>,
    Query(q): Query<CoinQuery>,
) -> Result<Json<DeviationOut>, ApiError> {
    let asset = q.asset()?;
    let rows = state
        .store
        .recent(asset, state.deviation_window)
        .await
        .map_err(|e| {
            tracing::error!(target: "api", asset = %asset, error = %e, "recent snapshots query failed");
            ApiError::Internal("Failed to calculate price deviation".into())
        })?;

    if rows.is_empty() {
        return Err(ApiError::NotFound(
            "No price records found for the specified coin".into(),
        ));
    }

    let prices: Vec<f64> = rows.iter().map(|s| s.price_usd).collect();
    Ok(Json(DeviationOut {
        deviation: round2(standard_deviation(&prices)),
    }))
}

#[derive(Serialize)]
struct StoreOut {
    message: &'static str,
    results: Vec<AssetOutcome>,
}

/// Manual ingestion, same code path as a channel trigger.
async fn store_stats(State(state): State<AppState>) -> Json<StoreOut> {
    let report = state.ingestion.run_ingestion().await;
    Json(StoreOut {
        message: "Crypto stats stored",
        results: report.outcomes,
    })
}
