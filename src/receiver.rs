//! Telemetry receiver facade
//!
//! Wires the full pipeline together: bounded ingest queue, persistence
//! worker pool, storage engine, distribution hub, shared counters, and the
//! periodic retention sweep. The embedding process plugs its transports in
//! at the edges: the listener callback calls [`IngestGate::offer`], and
//! each streaming RPC client gets a [`SubscriberSession`].

use std::sync::Arc;

use crate::config::ReceiverConfig;
use crate::error::Result;
use crate::hub::DistributionHub;
use crate::ingest::{ingest_channel, IngestGate, WorkerPool};
use crate::session::{CommandPublisher, SubscriberSession};
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::storage::{HistoryRecord, StorageEngine};

/// Running ingestion and distribution pipeline
pub struct TelemetryReceiver {
    config: ReceiverConfig,
    storage: Arc<StorageEngine>,
    hub: Arc<DistributionHub>,
    stats: Arc<PipelineStats>,
    gate: IngestGate,
    workers: WorkerPool,
    retention_handle: tokio::task::JoinHandle<()>,
}

impl TelemetryReceiver {
    /// Validate the configuration and start the pipeline
    ///
    /// The storage engine must already be open; a store that could not be
    /// opened is a fatal startup failure the embedding process handles
    /// before ever reaching this point.
    pub fn start(config: ReceiverConfig, storage: StorageEngine) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(storage);
        let stats = Arc::new(PipelineStats::new());
        let hub = Arc::new(DistributionHub::new(
            config.subscriber_buffer,
            Arc::clone(&stats),
        ));

        let (gate, queue) = ingest_channel(config.queue_capacity, Arc::clone(&stats));
        let workers = WorkerPool::spawn(
            config.worker_count,
            queue,
            Arc::clone(&storage),
            Arc::clone(&hub),
            Arc::clone(&stats),
        );

        let retention_handle =
            storage.spawn_retention_task(config.retention_days, config.retention_interval);

        tracing::info!(
            queue_capacity = config.queue_capacity,
            workers = config.worker_count,
            retention_days = config.retention_days,
            subscriber_buffer = config.subscriber_buffer,
            "Telemetry receiver started"
        );

        Ok(Self {
            config,
            storage,
            hub,
            stats,
            gate,
            workers,
            retention_handle,
        })
    }

    /// Entry point for the transport listener, cheap to clone
    pub fn gate(&self) -> IngestGate {
        self.gate.clone()
    }

    /// Open a subscriber session for one streaming RPC client
    pub fn open_session(&self, publisher: Arc<dyn CommandPublisher>) -> SubscriberSession {
        SubscriberSession::new(Arc::clone(&self.hub), publisher, Arc::clone(&self.stats))
    }

    /// Query the history trail for one point, ascending by timestamp
    pub async fn get_history(
        &self,
        device: &str,
        parameter: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<HistoryRecord>> {
        self.storage
            .get_history(device, parameter, start_ms, end_ms)
            .await
    }

    /// Point-in-time pipeline counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The distribution hub (for transports that manage subscriptions directly)
    pub fn hub(&self) -> &Arc<DistributionHub> {
        &self.hub
    }

    /// The storage engine
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// The configuration in effect
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Drain and stop the pipeline
    ///
    /// Closes this receiver's gate, lets the workers finish whatever is
    /// already queued (any gate clones still held by the transport keep the
    /// queue open until they are dropped), stops the retention sweep, then
    /// checkpoints and closes the store.
    pub async fn shutdown(self) {
        drop(self.gate);
        self.workers.join().await;
        self.retention_handle.abort();
        self.storage.close().await;

        tracing::info!("Telemetry receiver stopped");
    }
}
