//! In-process transport on top of `tokio::sync::broadcast`.
//! Used for single-process mode and in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use super::{PubSub, Subscription, Transport, SUBSCRIPTION_BUFFER};
use crate::error::ChannelError;

const TOPIC_CAPACITY: usize = 256;

#[derive(Debug, Default)]
pub struct MemoryBus {
    topics: Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>,
    closed: AtomicBool,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> Result<broadcast::Sender<Vec<u8>>, String> {
        let mut topics = self.topics.lock().map_err(|_| "topic map poisoned".to_string())?;
        Ok(topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone())
    }

    fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ChannelError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PubSub for MemoryBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        self.ensure_open()?;
        let tx = self.sender(topic).map_err(|reason| ChannelError::Publish {
            topic: topic.to_string(),
            reason,
        })?;
        // No receivers is not an error for pub/sub.
        let _ = tx.send(payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError> {
        self.ensure_open()?;
        let mut bus_rx = self
            .sender(topic)
            .map_err(|reason| ChannelError::Subscribe {
                topic: topic.to_string(),
                reason,
            })?
            .subscribe();

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let name = topic.to_string();
        tokio::spawn(async move {
            loop {
                match bus_rx.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(target: "channel", topic = %name, skipped = n, "subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Subscription::new(topic, rx))
    }

    async fn close(&self) -> Result<(), ChannelError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        // Dropping the senders ends every forwarder, which ends the subscriptions.
        if let Ok(mut topics) = self.topics.lock() {
            topics.clear();
        }
        Ok(())
    }

    fn transport(&self) -> Transport {
        Transport::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_every_subscriber_of_topic() {
        let bus = MemoryBus::new();
        let mut a = bus.subscribe("t").await.unwrap();
        let mut b = bus.subscribe("t").await.unwrap();
        let mut other = bus.subscribe("other").await.unwrap();

        bus.publish("t", b"hi".to_vec()).await.unwrap();
        assert_eq!(a.next().await.unwrap(), b"hi");
        assert_eq!(b.next().await.unwrap(), b"hi");

        bus.close().await.unwrap();
        assert!(other.next().await.is_none());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = MemoryBus::new();
        bus.publish("nobody", b"x".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn closed_bus_rejects_work() {
        let bus = MemoryBus::new();
        bus.close().await.unwrap();
        assert!(matches!(bus.close().await, Err(ChannelError::Closed)));
        assert!(matches!(
            bus.publish("t", vec![]).await,
            Err(ChannelError::Closed)
        ));
    }
}
