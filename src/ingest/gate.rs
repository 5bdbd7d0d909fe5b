//! Ingest gate and bounded queue
//!
//! The gate is the single entry point from the transport listener into the
//! pipeline. It is a non-blocking admission check over a bounded queue:
//! when the queue is full the event is dropped immediately rather than
//! blocking the listener. This is the backpressure mechanism that protects
//! the protocol listener from a slow database.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;

use crate::stats::PipelineStats;

use super::event::TelemetryEvent;

/// Create the bounded ingest queue
///
/// Returns the gate (producer side, cheap to clone for listener callbacks)
/// and the queue (consumer side, shared by the worker pool). The queue
/// closes once every gate clone is dropped.
pub fn ingest_channel(
    capacity: usize,
    stats: Arc<PipelineStats>,
) -> (IngestGate, IngestQueue) {
    let (tx, rx) = mpsc::channel(capacity);

    let gate = IngestGate {
        tx,
        stats: Arc::clone(&stats),
    };
    let queue = IngestQueue {
        rx: Arc::new(Mutex::new(rx)),
        stats,
    };

    (gate, queue)
}

/// Producer side of the ingest queue
///
/// Safe to call concurrently from the transport-listener context for every
/// incoming event.
#[derive(Clone)]
pub struct IngestGate {
    tx: mpsc::Sender<TelemetryEvent>,
    stats: Arc<PipelineStats>,
}

impl IngestGate {
    /// Attempt to enqueue an event without waiting
    ///
    /// Returns `false` (and counts the drop) when the queue is at capacity.
    pub fn offer(&self, event: TelemetryEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.stats.inc_received();
                self.stats
                    .set_queue_depth(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(TrySendError::Full(event)) => {
                self.stats.inc_ingest_dropped();
                tracing::warn!(
                    device = %event.device,
                    parameter = %event.parameter,
                    "Dropped incoming event, ingest queue full"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                // Worker pool already shut down; treat like a drop.
                self.stats.inc_ingest_dropped();
                tracing::warn!(
                    device = %event.device,
                    parameter = %event.parameter,
                    "Dropped incoming event, pipeline is shut down"
                );
                false
            }
        }
    }
}

/// Consumer side of the ingest queue, shared by all workers
///
/// Cloneable handle over a single receiver; no event is ever delivered to
/// more than one worker.
#[derive(Clone)]
pub struct IngestQueue {
    rx: Arc<Mutex<mpsc::Receiver<TelemetryEvent>>>,
    stats: Arc<PipelineStats>,
}

impl IngestQueue {
    /// Wait for the next event
    ///
    /// Blocking here is not overload, just an idle worker. Returns `None`
    /// when the queue is closed and drained.
    pub async fn next(&self) -> Option<TelemetryEvent> {
        let event = self.rx.lock().await.recv().await;
        if event.is_some() {
            self.stats.dec_queue_depth();
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offer_and_drain() {
        let stats = Arc::new(PipelineStats::new());
        let (gate, queue) = ingest_channel(4, stats.clone());

        assert!(gate.offer(TelemetryEvent::new("boiler", "temp", "21")));
        assert_eq!(stats.snapshot().received, 1);
        assert_eq!(stats.snapshot().queue_depth, 1);

        let event = queue.next().await.unwrap();
        assert_eq!(event.device, "boiler");
        assert_eq!(stats.snapshot().queue_depth, 0);
    }

    #[tokio::test]
    async fn test_backpressure_accepts_capacity_rejects_rest() {
        let stats = Arc::new(PipelineStats::new());
        let capacity = 3;
        let extra = 2;
        let (gate, _queue) = ingest_channel(capacity, stats.clone());

        let mut accepted = 0;
        let mut rejected = 0;
        for i in 0..capacity + extra {
            if gate.offer(TelemetryEvent::new("d", "p", i.to_string())) {
                accepted += 1;
            } else {
                rejected += 1;
            }
        }

        assert_eq!(accepted, capacity);
        assert_eq!(rejected, extra);

        let snap = stats.snapshot();
        assert_eq!(snap.received, capacity as u64);
        assert_eq!(snap.ingest_dropped, extra as u64);
        assert_eq!(snap.queue_depth, capacity);
    }

    #[tokio::test]
    async fn test_queue_closes_after_gates_drop() {
        let stats = Arc::new(PipelineStats::new());
        let (gate, queue) = ingest_channel(4, stats);

        let clone = gate.clone();
        assert!(clone.offer(TelemetryEvent::new("d", "p", "1")));

        drop(gate);
        drop(clone);

        // Buffered event is still drained, then the queue ends
        assert!(queue.next().await.is_some());
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn test_events_are_delivered_once() {
        let stats = Arc::new(PipelineStats::new());
        let (gate, queue) = ingest_channel(8, stats);

        for i in 0..4 {
            assert!(gate.offer(TelemetryEvent::new("d", "p", i.to_string())));
        }
        drop(gate);

        let a = queue.clone();
        let b = queue.clone();
        let (got_a, got_b) = tokio::join!(
            async {
                let mut out = Vec::new();
                while let Some(ev) = a.next().await {
                    out.push(ev.value);
                }
                out
            },
            async {
                let mut out = Vec::new();
                while let Some(ev) = b.next().await {
                    out.push(ev.value);
                }
                out
            }
        );

        let mut all: Vec<String> = got_a.into_iter().chain(got_b).collect();
        all.sort();
        assert_eq!(all, vec!["0", "1", "2", "3"]);
    }
}
