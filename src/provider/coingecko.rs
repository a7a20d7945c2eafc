use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use serde::Deserialize;

use super::{PriceProvider, PriceQuote};
use crate::asset::AssetId;
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Raw `/simple/price` entry. Fields come back as `null` for thinly traded ids.
#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
    usd_market_cap: Option<f64>,
    usd_24h_change: Option<f64>,
}

impl SimplePriceEntry {
    fn into_quote(self) -> Option<PriceQuote> {
        Some(PriceQuote {
            price_usd: self.usd?,
            market_cap_usd: self.usd_market_cap?,
            change_24h_pct: self.usd_24h_change?,
        })
    }
}

/// CoinGecko-backed provider using `GET {base}/simple/price`.
#[derive(Clone)]
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    /// Every request is bounded by `timeout`, so a hung upstream surfaces as
    /// `ProviderError::Unavailable`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/simple/price", self.base_url)
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    async fn fetch_many(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, PriceQuote>, ProviderError> {
        if assets.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = assets
            .iter()
            .map(AssetId::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let t0 = std::time::Instant::now();
        let sent = self
            .client
            .get(self.endpoint())
            .header("accept", "application/json")
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", "usd"),
                ("include_market_cap", "true"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await;
        // Recorded before any error check so failed calls are measured too.
        histogram!("provider_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        let resp = sent?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "upstream answered {status}"
            )));
        }

        let body: HashMap<String, SimplePriceEntry> = resp.json().await?;

        let mut out = HashMap::with_capacity(assets.len());
        for (id, entry) in body {
            // Ids we did not ask for, or cannot name, are ignored.
            let Ok(asset) = id.parse::<AssetId>() else {
                continue;
            };
            if !assets.contains(&asset) {
                continue;
            }
            match entry.into_quote() {
                Some(q) => {
                    out.insert(asset, q);
                }
                None => tracing::debug!(asset = %asset, "incomplete quote treated as missing"),
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}
