//! Distribution hub implementation
//!
//! The central fan-out point that routes committed value updates from the
//! persistence workers to every connected subscriber.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::stats::PipelineStats;

use super::handle::SubscriberHandle;
use super::update::ValueUpdate;

/// Central fan-out hub for value notifications
///
/// Subscribers are bounded `mpsc` buffers registered under one mutex.
/// Broadcast snapshots the subscriber set under the lock, then performs a
/// non-blocking send per subscriber: a full buffer loses that one message
/// for that one subscriber, and delivery continues to the rest. The
/// broadcasting worker is never blocked, no matter how many subscribers
/// are connected or how slow they are.
pub struct DistributionHub {
    /// Subscriber output buffers, keyed by subscriber id
    subscribers: Mutex<HashMap<u64, mpsc::Sender<ValueUpdate>>>,

    /// Next subscriber id
    next_id: AtomicU64,

    /// Default output buffer capacity for new subscribers
    buffer_capacity: usize,

    /// Shared pipeline counters
    stats: Arc<PipelineStats>,
}

impl DistributionHub {
    /// Create a new hub with the given default subscriber buffer capacity
    pub fn new(buffer_capacity: usize, stats: Arc<PipelineStats>) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer_capacity,
            stats,
        }
    }

    /// Register a new subscriber with the default buffer capacity
    pub fn subscribe(&self) -> SubscriberHandle {
        self.subscribe_with_capacity(self.buffer_capacity)
    }

    /// Register a new subscriber with an explicit buffer capacity
    pub fn subscribe_with_capacity(&self, capacity: usize) -> SubscriberHandle {
        let (tx, rx) = mpsc::channel(capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let total = {
            let mut subs = self.subscribers.lock().expect("subscriber set poisoned");
            subs.insert(id, tx);
            subs.len()
        };

        tracing::info!(subscriber_id = id, subscribers = total, "Subscriber added");

        SubscriberHandle { id, rx }
    }

    /// Remove a subscriber and close its buffer
    ///
    /// Consumes the handle, so each subscription is unsubscribed exactly
    /// once by its owning session. Buffered notifications the session never
    /// read are discarded with the handle.
    pub fn unsubscribe(&self, handle: SubscriberHandle) {
        let total = {
            let mut subs = self.subscribers.lock().expect("subscriber set poisoned");
            subs.remove(&handle.id);
            subs.len()
        };

        tracing::info!(
            subscriber_id = handle.id,
            subscribers = total,
            "Subscriber removed"
        );
    }

    /// Broadcast an update to every subscriber
    ///
    /// Never blocks: full subscriber buffers drop the message for that
    /// subscriber only. Dropped deliveries are counted and logged once per
    /// broadcast.
    pub fn broadcast(&self, update: ValueUpdate) {
        // Snapshot under the lock, send outside it
        let targets: Vec<(u64, mpsc::Sender<ValueUpdate>)> = {
            let subs = self.subscribers.lock().expect("subscriber set poisoned");
            subs.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut dropped = 0u64;
        for (id, tx) in targets {
            match tx.try_send(update.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    tracing::debug!(
                        subscriber_id = id,
                        device = %update.device,
                        parameter = %update.parameter,
                        "Subscriber buffer full, dropping notification"
                    );
                }
                // Receiver already gone; removal races are benign, the
                // unsubscribe call will clean up the map entry.
                Err(TrySendError::Closed(_)) => {}
            }
        }

        if dropped > 0 {
            self.stats.add_broadcast_dropped(dropped);
            tracing::warn!(
                dropped = dropped,
                device = %update.device,
                parameter = %update.parameter,
                "Broadcast dropped notifications for slow subscribers"
            );
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber set poisoned")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(capacity: usize) -> (DistributionHub, Arc<PipelineStats>) {
        let stats = Arc::new(PipelineStats::new());
        (DistributionHub::new(capacity, stats.clone()), stats)
    }

    fn update(value: &str) -> ValueUpdate {
        ValueUpdate::new("boiler", "temperature", value, 1_000)
    }

    #[tokio::test]
    async fn test_subscribe_broadcast_receive() {
        let (hub, _) = hub(10);

        let mut handle = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        hub.broadcast(update("21.5"));

        let received = handle.recv().await.unwrap();
        assert_eq!(received.value, "21.5");
        assert_eq!(received.key(), crate::hub::PointKey::new("boiler", "temperature"));
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_buffer() {
        let (hub, _) = hub(10);

        let mut a = hub.subscribe();
        let b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        hub.broadcast(update("1"));
        hub.unsubscribe(b);
        assert_eq!(hub.subscriber_count(), 1);

        // Remaining subscriber is unaffected
        assert_eq!(a.recv().await.unwrap().value, "1");
    }

    #[tokio::test]
    async fn test_recv_drains_then_ends_after_unsubscribe() {
        let (hub, _) = hub(10);

        let mut keeper = hub.subscribe();
        hub.broadcast(update("1"));
        hub.broadcast(update("2"));

        // Simulate the hub side going away while messages are buffered
        let id = keeper.id();
        {
            let mut subs = hub.subscribers.lock().unwrap();
            subs.remove(&id);
        }

        assert_eq!(keeper.recv().await.unwrap().value, "1");
        assert_eq!(keeper.recv().await.unwrap().value, "2");
        assert!(keeper.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_isolation_slow_subscriber() {
        let (hub, stats) = hub(100);

        // A: capacity 1, never drained. B: drained continuously.
        let mut slow = hub.subscribe_with_capacity(1);
        let mut fast = hub.subscribe();

        let n = 5;
        for i in 0..n {
            hub.broadcast(update(&i.to_string()));
        }

        // B got all N, in order
        for i in 0..n {
            assert_eq!(fast.recv().await.unwrap().value, i.to_string());
        }

        // A got exactly 1, the rest were dropped and counted
        assert_eq!(slow.try_recv().unwrap().value, "0");
        assert!(slow.try_recv().is_none());
        assert_eq!(stats.snapshot().broadcast_dropped, (n - 1) as u64);
    }

    #[tokio::test]
    async fn test_broadcast_with_no_subscribers() {
        let (hub, stats) = hub(10);

        hub.broadcast(update("ignored"));

        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(stats.snapshot().broadcast_dropped, 0);
    }

    #[tokio::test]
    async fn test_broadcast_order_per_subscriber() {
        let (hub, _) = hub(10);
        let mut handle = hub.subscribe();

        for value in ["5", "7", "9"] {
            hub.broadcast(update(value));
        }

        assert_eq!(handle.recv().await.unwrap().value, "5");
        assert_eq!(handle.recv().await.unwrap().value, "7");
        assert_eq!(handle.recv().await.unwrap().value, "9");
    }
}
