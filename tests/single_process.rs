// tests/single_process.rs
//
// Memory transport end to end: embedded scheduler -> bus -> consumer -> store.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{service, Scripted, ScriptedProvider};
use crypto_price_tracker::channel::{MemoryBus, PubSub};
use crypto_price_tracker::consumer::TriggerConsumer;
use crypto_price_tracker::scheduler::TriggerScheduler;
use crypto_price_tracker::store::SnapshotStore;
use crypto_price_tracker::AssetId;
use tokio::sync::watch;

const TOPIC: &str = "crypto.update";
const INTERVAL: Duration = Duration::from_secs(15 * 60);

async fn wait_for_rows(store: &crypto_price_tracker::store::MemoryStore, n: usize) {
    for _ in 0..500 {
        if store.len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn embedded_scheduler_drives_ingestion_through_memory_bus() {
    let provider = Arc::new(ScriptedProvider::new(&[
        (AssetId::Bitcoin, Scripted::Quote(100.0)),
        (AssetId::Ethereum, Scripted::Quote(3000.0)),
    ]));
    let (svc, store) = service(provider.clone(), vec![AssetId::Bitcoin, AssetId::Ethereum]);
    let bus: Arc<dyn PubSub> = Arc::new(MemoryBus::new());

    // Consumer subscribes before the scheduler primes, same order as the binary.
    let consumer_task = TriggerConsumer::new(svc, TOPIC)
        .start(bus.as_ref())
        .await
        .expect("subscribe");

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut scheduler = TriggerScheduler::new(TOPIC, INTERVAL);
    scheduler.attach(Arc::clone(&bus));
    let scheduler_task = scheduler.spawn(stop_rx);

    // Priming trigger alone.
    wait_for_rows(&store, 2).await;
    assert_eq!(store.len(), 2);

    // One full interval later the first tick lands.
    tokio::time::sleep(INTERVAL).await;
    wait_for_rows(&store, 4).await;
    assert_eq!(store.len(), 4);
    assert_eq!(provider.calls(), 4);
    assert_eq!(store.recent(AssetId::Bitcoin, 10).await.unwrap().len(), 2);

    stop_tx.send(true).unwrap();
    scheduler_task
        .await
        .unwrap()
        .expect("scheduler closes the bus cleanly");

    // Closing the bus ends the consumer loop.
    tokio::time::timeout(Duration::from_secs(5), consumer_task)
        .await
        .expect("consumer ends after close")
        .unwrap();
}
