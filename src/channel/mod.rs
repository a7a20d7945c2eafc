// src/channel/mod.rs
//! Publish/subscribe capability the scheduler and consumer talk through.
//!
//! The transport (Redis or in-process) is chosen from configuration; both
//! sides only see [`PubSub`].

pub mod memory;
pub mod redis;
pub mod trigger;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ChannelError;

pub use memory::MemoryBus;
pub use redis::RedisBus;
pub use trigger::{decode_trigger, TriggerMessage, UpdateTrigger};

pub const DEFAULT_TOPIC: &str = "crypto.update";

/// Buffered payloads per subscription before the forwarder applies backpressure.
pub(crate) const SUBSCRIPTION_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Redis,
    Memory,
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Transport::Redis),
            "memory" => Ok(Transport::Memory),
            other => Err(format!("unknown channel transport '{other}'")),
        }
    }
}

/// Stream of raw payloads for one subscribed topic.
///
/// Yields `None` once the transport side has gone away.
pub struct Subscription {
    topic: String,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl Subscription {
    pub(crate) fn new(topic: impl Into<String>, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            rx,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn next(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

#[async_trait]
pub trait PubSub: Send + Sync {
    /// Fire-and-forget: succeeds even when nobody is subscribed.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError>;

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError>;

    /// Release the connection. A second call reports `ChannelError::Closed`.
    async fn close(&self) -> Result<(), ChannelError>;

    fn transport(&self) -> Transport;
}

/// Open the configured transport. Errors here are fatal for the binaries.
pub async fn connect(transport: Transport, redis_url: &str) -> Result<Arc<dyn PubSub>, ChannelError> {
    match transport {
        Transport::Memory => Ok(Arc::new(MemoryBus::new())),
        Transport::Redis => Ok(Arc::new(RedisBus::connect(redis_url).await?)),
    }
}
