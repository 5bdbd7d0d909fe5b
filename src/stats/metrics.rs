//! Pipeline counters and processing-latency histogram
//!
//! All counters are plain atomics shared across the listener callback, the
//! persistence workers, the distribution hub, and the command relay.
//! Exposition (Prometheus endpoint etc.) is the embedding process's concern;
//! this module only accumulates.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Upper bucket bounds for the processing-latency histogram, in milliseconds
const LATENCY_BUCKETS_MS: [u64; 10] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 2500];

/// Shared counters for the ingestion and distribution pipeline
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Events accepted into the ingest queue
    received: AtomicU64,
    /// Events rejected because the ingest queue was full
    ingest_dropped: AtomicU64,
    /// Events lost to persistence failures
    processing_errors: AtomicU64,
    /// Notifications dropped because a subscriber buffer was full
    broadcast_dropped: AtomicU64,
    /// Commands successfully forwarded to the publish interface
    commands_published: AtomicU64,
    /// Commands whose publish attempt failed
    publish_errors: AtomicU64,
    /// Current ingest queue depth
    queue_depth: AtomicUsize,
    /// Per-event persist-and-broadcast latency
    processing: LatencyHistogram,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ingest_dropped(&self) {
        self.ingest_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_processing_errors(&self) {
        self.processing_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_broadcast_dropped(&self, n: u64) {
        self.broadcast_dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_commands_published(&self) {
        self.commands_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_publish_errors(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Decrement the queue-depth gauge as a worker drains one event
    pub fn dec_queue_depth(&self) {
        let _ = self
            .queue_depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
                Some(d.saturating_sub(1))
            });
    }

    /// Record one event's processing latency at the point of successful persistence
    pub fn observe_processing(&self, elapsed: Duration) {
        self.processing.observe(elapsed);
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            ingest_dropped: self.ingest_dropped.load(Ordering::Relaxed),
            processing_errors: self.processing_errors.load(Ordering::Relaxed),
            broadcast_dropped: self.broadcast_dropped.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            processing: self.processing.snapshot(),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub received: u64,
    pub ingest_dropped: u64,
    pub processing_errors: u64,
    pub broadcast_dropped: u64,
    pub commands_published: u64,
    pub publish_errors: u64,
    pub queue_depth: usize,
    pub processing: LatencySnapshot,
}

/// Fixed-bucket latency histogram
///
/// Each observation lands in exactly one bucket; the final implicit bucket
/// catches everything past the largest bound.
#[derive(Debug, Default)]
pub struct LatencyHistogram {
    buckets: [AtomicU64; LATENCY_BUCKETS_MS.len() + 1],
    count: AtomicU64,
    sum_micros: AtomicU64,
}

impl LatencyHistogram {
    pub fn observe(&self, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        let idx = LATENCY_BUCKETS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(LATENCY_BUCKETS_MS.len());

        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let mut buckets = Vec::with_capacity(LATENCY_BUCKETS_MS.len() + 1);
        for (i, counter) in self.buckets.iter().enumerate() {
            let bound = LATENCY_BUCKETS_MS.get(i).copied();
            buckets.push((bound, counter.load(Ordering::Relaxed)));
        }

        LatencySnapshot {
            count: self.count.load(Ordering::Relaxed),
            sum_micros: self.sum_micros.load(Ordering::Relaxed),
            buckets,
        }
    }
}

/// Point-in-time copy of a [`LatencyHistogram`]
///
/// Bucket bounds are in milliseconds; `None` marks the overflow bucket.
#[derive(Debug, Clone, Default)]
pub struct LatencySnapshot {
    pub count: u64,
    pub sum_micros: u64,
    pub buckets: Vec<(Option<u64>, u64)>,
}

impl LatencySnapshot {
    /// Mean observed latency in milliseconds, 0.0 if nothing was observed
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum_micros as f64 / self.count as f64) / 1000.0
        }
    }
}
