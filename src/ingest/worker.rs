//! Persistence worker pool
//!
//! A fixed number of workers drain the shared ingest queue, persist each
//! event through the storage engine, and on success hand the committed
//! value to the distribution hub. A persistence failure drops that one
//! event; the worker keeps going.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::hub::{DistributionHub, ValueUpdate};
use crate::stats::PipelineStats;
use crate::storage::StorageEngine;

use super::gate::IngestQueue;

/// Fixed pool of persistence workers
pub struct WorkerPool {
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers draining `queue`
    pub fn spawn(
        count: usize,
        queue: IngestQueue,
        storage: Arc<StorageEngine>,
        hub: Arc<DistributionHub>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let handles = (0..count)
            .map(|worker_id| {
                let queue = queue.clone();
                let storage = Arc::clone(&storage);
                let hub = Arc::clone(&hub);
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    worker_loop(worker_id, queue, storage, hub, stats).await;
                })
            })
            .collect();

        Self { handles }
    }

    /// Number of workers in the pool
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit
    ///
    /// Workers exit once the queue is closed (all gates dropped) and fully
    /// drained.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    /// Abort all workers without draining
    pub fn abort(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: IngestQueue,
    storage: Arc<StorageEngine>,
    hub: Arc<DistributionHub>,
    stats: Arc<PipelineStats>,
) {
    tracing::debug!(worker_id = worker_id, "Persistence worker started");

    while let Some(event) = queue.next().await {
        let started = Instant::now();

        match storage
            .save_value(&event.device, &event.parameter, &event.value)
            .await
        {
            Ok(_) => {
                // Capture timestamp after the commit succeeded
                let timestamp_ms = Utc::now().timestamp_millis();
                hub.broadcast(ValueUpdate::new(
                    event.device,
                    event.parameter,
                    event.value,
                    timestamp_ms,
                ));
                stats.observe_processing(started.elapsed());
            }
            Err(e) => {
                // Event is lost, not retried; move on to the next one
                stats.inc_processing_errors();
                tracing::error!(
                    worker_id = worker_id,
                    device = %event.device,
                    parameter = %event.parameter,
                    error = %e,
                    "Failed to persist value"
                );
            }
        }
    }

    tracing::debug!(worker_id = worker_id, "Persistence worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::gate::ingest_channel;
    use crate::ingest::TelemetryEvent;

    async fn pipeline(
        workers: usize,
    ) -> (
        crate::ingest::IngestGate,
        WorkerPool,
        Arc<StorageEngine>,
        Arc<DistributionHub>,
        Arc<PipelineStats>,
    ) {
        let stats = Arc::new(PipelineStats::new());
        let storage = Arc::new(StorageEngine::open_in_memory().await.unwrap());
        let hub = Arc::new(DistributionHub::new(16, stats.clone()));
        let (gate, queue) = ingest_channel(32, stats.clone());
        let pool = WorkerPool::spawn(workers, queue, storage.clone(), hub.clone(), stats.clone());
        (gate, pool, storage, hub, stats)
    }

    #[tokio::test]
    async fn test_worker_persists_and_broadcasts() {
        let (gate, pool, storage, hub, _stats) = pipeline(1).await;
        let mut handle = hub.subscribe();

        assert!(gate.offer(TelemetryEvent::new("boiler", "temp", "21.5")));

        let update = handle.recv().await.unwrap();
        assert_eq!(update.value, "21.5");
        assert!(update.timestamp_ms > 0);

        let current = storage.get_current("boiler", "temp").await.unwrap().unwrap();
        assert_eq!(current.value, "21.5");

        drop(gate);
        pool.join().await;
    }

    #[tokio::test]
    async fn test_single_worker_preserves_order() {
        let (gate, pool, storage, hub, stats) = pipeline(1).await;
        let mut handle = hub.subscribe();

        assert!(gate.offer(TelemetryEvent::new("d1", "p1", "5")));
        assert!(gate.offer(TelemetryEvent::new("d1", "p1", "7")));

        assert_eq!(handle.recv().await.unwrap().value, "5");
        assert_eq!(handle.recv().await.unwrap().value, "7");

        let current = storage.get_current("d1", "p1").await.unwrap().unwrap();
        assert_eq!(current.value, "7");

        let history = storage.get_history("d1", "p1", 0, i64::MAX).await.unwrap();
        assert_eq!(
            history.iter().map(|h| h.value.as_str()).collect::<Vec<_>>(),
            vec!["5", "7"]
        );
        assert_eq!(stats.snapshot().processing.count, 2);

        drop(gate);
        pool.join().await;
    }

    #[tokio::test]
    async fn test_workers_drain_everything() {
        let (gate, pool, storage, _hub, stats) = pipeline(4).await;

        for i in 0..20 {
            assert!(gate.offer(TelemetryEvent::new("d", "p", i.to_string())));
        }
        drop(gate);
        pool.join().await;

        let history = storage.get_history("d", "p", 0, i64::MAX).await.unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(stats.snapshot().queue_depth, 0);
        assert_eq!(stats.snapshot().processing_errors, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_drops_event_and_continues() {
        let stats = Arc::new(PipelineStats::new());
        let storage = Arc::new(StorageEngine::open_in_memory().await.unwrap());
        let hub = Arc::new(DistributionHub::new(16, stats.clone()));
        let (gate, queue) = ingest_channel(8, stats.clone());

        // Closing the store makes every save fail
        storage.close().await;

        let pool = WorkerPool::spawn(1, queue, storage, hub.clone(), stats.clone());
        let mut handle = hub.subscribe();

        assert!(gate.offer(TelemetryEvent::new("d", "p", "1")));
        drop(gate);
        pool.join().await;

        assert_eq!(stats.snapshot().processing_errors, 1);
        // Nothing was broadcast for the failed event
        assert!(handle.try_recv().is_none());
    }
}
