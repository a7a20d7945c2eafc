// src/scheduler.rs
//! Trigger publisher: primes the consumer on start, then publishes one update
//! trigger per interval until shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::channel::{PubSub, UpdateTrigger};
use crate::error::ChannelError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Connected,
    Running,
    ShuttingDown,
    Closed,
}

pub struct TriggerScheduler {
    topic: String,
    interval: Duration,
    channel: Option<Arc<dyn PubSub>>,
    state: SchedulerState,
    published: u64,
}

impl TriggerScheduler {
    pub fn new(topic: impl Into<String>, interval: Duration) -> Self {
        Self {
            topic: topic.into(),
            interval,
            channel: None,
            state: SchedulerState::Idle,
            published: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Successful publishes so far (priming publish included).
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Hand over an established channel connection: `Idle -> Connected`.
    pub fn attach(&mut self, channel: Arc<dyn PubSub>) {
        self.channel = Some(channel);
        self.state = SchedulerState::Connected;
    }

    /// Publish until `shutdown` resolves, then close the channel.
    ///
    /// Individual publish failures are logged and the next tick still fires.
    /// Returns the close result; the caller maps it to the exit status.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), ChannelError>
    where
        F: Future<Output = ()>,
    {
        crate::metrics::describe_all();
        let channel = match (&self.channel, self.state) {
            (Some(c), SchedulerState::Connected) => Arc::clone(c),
            _ => return Err(ChannelError::Connection("scheduler is not connected".into())),
        };
        self.state = SchedulerState::Running;

        // Cold-start priming so a fresh consumer does not wait a full interval.
        self.publish_once(channel.as_ref()).await;

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            target: "scheduler",
            topic = %self.topic,
            interval_secs = self.interval.as_secs(),
            "update job scheduled"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.publish_once(channel.as_ref()).await,
            }
        }

        self.state = SchedulerState::ShuttingDown;
        tracing::info!(target: "scheduler", "shutdown requested, closing channel");
        drop(ticker);

        let closed = channel.close().await;
        self.channel = None;
        self.state = SchedulerState::Closed;
        match &closed {
            Ok(()) => tracing::info!(target: "scheduler", "channel closed"),
            Err(e) => tracing::error!(target: "scheduler", error = %e, "closing channel failed"),
        }
        closed
    }

    /// Run on its own task until `stop` turns `true` (or its sender is dropped).
    pub fn spawn(mut self, mut stop: watch::Receiver<bool>) -> JoinHandle<Result<(), ChannelError>> {
        tokio::spawn(async move {
            self.run(async move {
                let _ = stop.wait_for(|s| *s).await;
            })
            .await
        })
    }

    async fn publish_once(&mut self, channel: &dyn PubSub) {
        let trigger = UpdateTrigger::now();
        match channel.publish(&self.topic, trigger.to_bytes()).await {
            Ok(()) => {
                self.published += 1;
                counter!("triggers_published_total").increment(1);
                tracing::info!(target: "scheduler", topic = %self.topic, "update trigger published");
            }
            Err(e) => {
                counter!("trigger_publish_errors_total").increment(1);
                tracing::warn!(target: "scheduler", topic = %self.topic, error = %e, "publish failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryBus;

    #[tokio::test]
    async fn run_without_channel_is_rejected() {
        let mut s = TriggerScheduler::new("t", Duration::from_secs(1));
        assert_eq!(s.state(), SchedulerState::Idle);
        let res = s.run(async {}).await;
        assert!(matches!(res, Err(ChannelError::Connection(_))));
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn immediate_shutdown_still_primes_once_and_closes() {
        let mut s = TriggerScheduler::new("t", Duration::from_secs(60));
        s.attach(Arc::new(MemoryBus::new()));
        assert_eq!(s.state(), SchedulerState::Connected);
        s.run(async {}).await.unwrap();
        assert_eq!(s.published(), 1);
        assert_eq!(s.state(), SchedulerState::Closed);
    }
}
