// tests/scheduler_publish.rs
mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crypto_price_tracker::channel::{
    decode_trigger, MemoryBus, PubSub, Subscription, Transport, TriggerMessage,
};
use crypto_price_tracker::consumer::TriggerConsumer;
use crypto_price_tracker::error::ChannelError;
use crypto_price_tracker::scheduler::{SchedulerState, TriggerScheduler};
use crypto_price_tracker::AssetId;
use tokio::sync::oneshot;

const TOPIC: &str = "crypto.update";
const INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::test(start_paused = true)]
async fn primes_immediately_then_publishes_each_interval() {
    let bus = Arc::new(MemoryBus::new());
    let mut sub = bus.subscribe(TOPIC).await.unwrap();

    let mut scheduler = TriggerScheduler::new(TOPIC, INTERVAL);
    scheduler.attach(bus.clone());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let res = scheduler
            .run(async {
                let _ = stop_rx.await;
            })
            .await;
        (res, scheduler.published(), scheduler.state())
    });

    // Priming publish arrives before any interval has elapsed.
    let first = sub.next().await.expect("priming trigger");
    assert!(matches!(decode_trigger(&first), TriggerMessage::Update(_)));

    // Two full intervals plus a little.
    tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(1)).await;
    stop_tx.send(()).unwrap();

    let (res, published, state) = handle.await.unwrap();
    res.unwrap();
    assert_eq!(published, 3);
    assert_eq!(state, SchedulerState::Closed);

    let mut rest = 0;
    while let Some(payload) = sub.next().await {
        assert!(matches!(decode_trigger(&payload), TriggerMessage::Update(_)));
        rest += 1;
    }
    assert_eq!(rest, 2);
}

/// Transport whose publishes or close can be told to fail.
struct FlakyBus {
    fail_publish: bool,
    fail_close: bool,
    attempts: AtomicUsize,
}

impl FlakyBus {
    fn new(fail_publish: bool, fail_close: bool) -> Self {
        Self {
            fail_publish,
            fail_close,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PubSub for FlakyBus {
    async fn publish(&self, topic: &str, _payload: Vec<u8>) -> Result<(), ChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_publish {
            return Err(ChannelError::Publish {
                topic: topic.to_string(),
                reason: "broken pipe".into(),
            });
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError> {
        Err(ChannelError::Subscribe {
            topic: topic.to_string(),
            reason: "not supported".into(),
        })
    }

    async fn close(&self) -> Result<(), ChannelError> {
        if self.fail_close {
            Err(ChannelError::Connection("close timed out".into()))
        } else {
            Ok(())
        }
    }

    fn transport(&self) -> Transport {
        Transport::Memory
    }
}

#[tokio::test(start_paused = true)]
async fn publish_failures_are_swallowed_and_ticks_continue() {
    let bus = Arc::new(FlakyBus::new(true, false));
    let mut scheduler = TriggerScheduler::new(TOPIC, INTERVAL);
    scheduler.attach(bus.clone());

    let res = scheduler
        .run(tokio::time::sleep(INTERVAL * 3 + Duration::from_secs(1)))
        .await;

    assert!(res.is_ok());
    // priming + three ticks, all attempted despite failing
    assert_eq!(bus.attempts.load(Ordering::SeqCst), 4);
    assert_eq!(scheduler.published(), 0);
    assert_eq!(scheduler.state(), SchedulerState::Closed);
}

#[tokio::test(start_paused = true)]
async fn close_failure_is_reported() {
    let bus = Arc::new(FlakyBus::new(false, true));
    let mut scheduler = TriggerScheduler::new(TOPIC, INTERVAL);
    scheduler.attach(bus);

    let res = scheduler.run(tokio::time::sleep(Duration::from_secs(1))).await;

    assert!(matches!(res, Err(ChannelError::Connection(_))));
    assert_eq!(scheduler.published(), 1);
    assert_eq!(scheduler.state(), SchedulerState::Closed);
}

#[tokio::test]
async fn consumer_subscribe_failure_surfaces_to_caller() {
    let provider = Arc::new(common::ScriptedProvider::new(&[]));
    let (svc, _store) = common::service(provider, vec![AssetId::Bitcoin]);
    let bus = FlakyBus::new(false, false);

    let err = TriggerConsumer::new(svc, TOPIC)
        .start(&bus)
        .await
        .err()
        .expect("subscribe failure is returned");
    assert!(matches!(err, ChannelError::Subscribe { .. }));
}
