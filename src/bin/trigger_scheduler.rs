//! Trigger scheduler entrypoint.
//! Publishes `{"trigger":"update",...}` on start and then every interval until
//! SIGINT/SIGTERM.
//!
//! Exit status: 0 after a clean shutdown; 1 if the channel cannot be reached
//! at startup or cannot be closed on the way out.

use std::process::ExitCode;

use crypto_price_tracker::channel;
use crypto_price_tracker::config::AppConfig;
use crypto_price_tracker::scheduler::TriggerScheduler;
use crypto_price_tracker::{shutdown, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut scheduler = TriggerScheduler::new(cfg.topic.clone(), cfg.update_interval);

    info!(transport = ?cfg.transport, "connecting to update channel");
    let bus = match channel::connect(cfg.transport, &cfg.redis_url).await {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "failed to connect to update channel");
            return ExitCode::FAILURE;
        }
    };
    scheduler.attach(bus);

    match scheduler.run(shutdown::signal()).await {
        Ok(()) => {
            info!(published = scheduler.published(), "scheduler stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "scheduler shutdown failed");
            ExitCode::FAILURE
        }
    }
}
