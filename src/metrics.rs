use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Completed ingestion runs.");
        describe_counter!(
            "ingest_asset_success_total",
            "Assets fetched and persisted, by asset."
        );
        describe_counter!(
            "ingest_asset_failures_total",
            "Assets that failed to fetch or persist, by asset."
        );
        describe_histogram!(
            "ingest_run_duration_ms",
            "Wall time of one ingestion run in milliseconds."
        );
        describe_histogram!("provider_fetch_ms", "Price provider round trip in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when ingestion last started.");
        describe_counter!("triggers_published_total", "Update triggers published.");
        describe_counter!(
            "trigger_publish_errors_total",
            "Update triggers that failed to publish."
        );
        describe_counter!("triggers_received_total", "Channel messages received.");
        describe_counter!(
            "triggers_ignored_total",
            "Channel messages dropped as malformed or foreign."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder. Fails if one is already installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_all();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
