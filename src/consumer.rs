// src/consumer.rs
//! Trigger consumer: turns update triggers on the channel into ingestion runs.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::channel::{decode_trigger, PubSub, Subscription, TriggerMessage};
use crate::error::ChannelError;
use crate::ingest::{IngestionReport, IngestionService};

pub struct TriggerConsumer {
    ingestion: Arc<IngestionService>,
    topic: String,
}

impl TriggerConsumer {
    pub fn new(ingestion: Arc<IngestionService>, topic: impl Into<String>) -> Self {
        Self {
            ingestion,
            topic: topic.into(),
        }
    }

    /// Subscribe and spawn the consume loop. A subscribe failure is returned
    /// to the caller, which treats it as fatal.
    pub async fn start(self, channel: &dyn PubSub) -> Result<JoinHandle<()>, ChannelError> {
        let subscription = channel.subscribe(&self.topic).await?;
        tracing::info!(
            target: "consumer",
            topic = %self.topic,
            transport = ?channel.transport(),
            "subscribed to update channel"
        );
        Ok(tokio::spawn(async move { self.run(subscription).await }))
    }

    /// Handle messages one at a time until the subscription ends. Awaiting each
    /// run before reading the next message keeps at most one run in flight.
    pub async fn run(&self, mut subscription: Subscription) {
        crate::metrics::describe_all();
        while let Some(payload) = subscription.next().await {
            let _ = self.handle_message(&payload).await;
        }
        tracing::info!(target: "consumer", topic = subscription.topic(), "subscription closed");
    }

    /// Returns the report when the payload was a valid update trigger and the
    /// run completed; `None` for ignored messages and failed runs.
    pub async fn handle_message(&self, payload: &[u8]) -> Option<IngestionReport> {
        counter!("triggers_received_total").increment(1);
        let trigger = match decode_trigger(payload) {
            TriggerMessage::Update(t) => t,
            TriggerMessage::Foreign(kind) => {
                counter!("triggers_ignored_total").increment(1);
                tracing::debug!(target: "consumer", kind = %kind, "ignoring non-update trigger");
                return None;
            }
            TriggerMessage::Malformed(reason) => {
                counter!("triggers_ignored_total").increment(1);
                tracing::debug!(target: "consumer", reason = %reason, "ignoring malformed message");
                return None;
            }
        };

        tracing::info!(
            target: "consumer",
            issued_at = ?trigger.issued_at,
            "update trigger received, running ingestion"
        );

        // Run on its own task so a panic inside the run is contained here.
        let svc = Arc::clone(&self.ingestion);
        match tokio::spawn(async move { svc.run_ingestion().await }).await {
            Ok(report) => {
                for o in &report.outcomes {
                    tracing::info!(
                        target: "consumer",
                        asset = %o.asset_id,
                        status = ?o.status,
                        reason = o.reason.as_deref().unwrap_or(""),
                        "ingestion outcome"
                    );
                }
                Some(report)
            }
            Err(e) => {
                tracing::error!(target: "consumer", error = %e, "ingestion run failed");
                None
            }
        }
    }
}
