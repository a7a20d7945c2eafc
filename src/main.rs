//! Consumer + query API entrypoint.
//! Subscribes to update triggers, runs ingestion on each one, and serves the
//! stats/deviation endpoints over the same snapshot store.
//!
//! With `CHANNEL_TRANSPORT=memory` the trigger scheduler runs in this process
//! too, so the whole pipeline works without an external broker.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crypto_price_tracker::api::{self, AppState};
use crypto_price_tracker::channel::{self, Transport};
use crypto_price_tracker::config::AppConfig;
use crypto_price_tracker::consumer::TriggerConsumer;
use crypto_price_tracker::metrics::Metrics;
use crypto_price_tracker::scheduler::TriggerScheduler;
use crypto_price_tracker::{build_ingestion, shutdown, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = AppConfig::load().context("loading configuration")?;
    info!(
        transport = ?cfg.transport,
        topic = %cfg.topic,
        assets = ?cfg.assets,
        store = if cfg.database_url.is_some() { "sqlite" } else { "memory" },
        "configuration loaded"
    );

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!("metrics disabled: {e:#}");
            None
        }
    };

    let (ingestion, store) = build_ingestion(&cfg).await?;

    let bus = channel::connect(cfg.transport, &cfg.redis_url)
        .await
        .context("connecting to update channel")?;

    let consumer = TriggerConsumer::new(Arc::clone(&ingestion), cfg.topic.clone());
    let consumer_task = consumer
        .start(bus.as_ref())
        .await
        .context("subscribing to update channel")?;

    // Single-process mode: the scheduler shares the in-memory bus.
    let (stop_tx, stop_rx) = watch::channel(false);
    let embedded = (cfg.transport == Transport::Memory).then(|| {
        let mut scheduler = TriggerScheduler::new(cfg.topic.clone(), cfg.update_interval);
        scheduler.attach(Arc::clone(&bus));
        scheduler.spawn(stop_rx)
    });

    let mut app = api::router(AppState {
        ingestion,
        store,
        deviation_window: cfg.deviation_window,
    });
    if let Some(m) = &metrics {
        app = app.merge(m.router());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "crypto price tracker listening");

    // The consumer ending on its own is fatal; a supervisor restarts us.
    let mut consumer_task = consumer_task;
    let consumer_stopped = tokio::select! {
        res = async { axum::serve(listener, app).with_graceful_shutdown(shutdown::signal()).await } => {
            res.context("http server")?;
            false
        }
        _ = &mut consumer_task => {
            error!("update consumer stopped unexpectedly");
            true
        }
    };

    info!("shutting down");
    let closed = match embedded {
        Some(handle) => {
            let _ = stop_tx.send(true);
            handle.await.context("joining embedded scheduler")?
        }
        None => bus.close().await,
    };
    consumer_task.abort();
    closed.context("closing update channel")?;
    info!("update channel closed");
    if consumer_stopped {
        bail!("update consumer stopped");
    }
    Ok(())
}
