// tests/common/mod.rs
// Shared fakes for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crypto_price_tracker::error::ProviderError;
use crypto_price_tracker::ingest::IngestionService;
use crypto_price_tracker::provider::{PriceProvider, PriceQuote};
use crypto_price_tracker::store::MemoryStore;
use crypto_price_tracker::AssetId;

#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Quote(f64),
    NotFound,
    Unavailable,
}

/// Provider answering from a per-asset script. Unscripted assets are not found.
pub struct ScriptedProvider {
    script: Mutex<HashMap<AssetId, Scripted>>,
    calls: AtomicUsize,
    panic_next: AtomicBool,
}

impl ScriptedProvider {
    pub fn new(entries: &[(AssetId, Scripted)]) -> Self {
        Self {
            script: Mutex::new(entries.iter().copied().collect()),
            calls: AtomicUsize::new(0),
            panic_next: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set(&self, asset: AssetId, s: Scripted) {
        self.script.lock().unwrap().insert(asset, s);
    }

    pub fn panic_on_next_call(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }
}

pub fn quote(price: f64) -> PriceQuote {
    PriceQuote {
        price_usd: price,
        market_cap_usd: price * 1_000_000.0,
        change_24h_pct: 2.5,
    }
}

#[async_trait]
impl PriceProvider for ScriptedProvider {
    async fn fetch_many(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, PriceQuote>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("scripted provider panic");
        }
        let script = self.script.lock().unwrap().clone();
        let mut out = HashMap::new();
        for a in assets {
            match script.get(a).copied().unwrap_or(Scripted::NotFound) {
                Scripted::Quote(p) => {
                    out.insert(*a, quote(p));
                }
                Scripted::NotFound => {}
                Scripted::Unavailable => {
                    return Err(ProviderError::Unavailable("connection refused".into()))
                }
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn service(
    provider: Arc<ScriptedProvider>,
    assets: Vec<AssetId>,
) -> (Arc<IngestionService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let svc = Arc::new(IngestionService::new(provider, store.clone(), assets));
    (svc, store)
}
