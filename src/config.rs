//! Receiver configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Highest MQTT-style quality-of-service level
pub const MAX_QOS: u8 = 2;

/// Configuration for the ingestion and distribution pipeline
///
/// All values are fixed at startup; the pipeline does not support live
/// reconfiguration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Capacity of the bounded ingest queue
    pub queue_capacity: usize,

    /// Number of persistence workers draining the queue
    pub worker_count: usize,

    /// History rows older than this many days are pruned
    pub retention_days: u32,

    /// How often the retention sweep runs
    pub retention_interval: Duration,

    /// Capacity of each subscriber's output buffer
    pub subscriber_buffer: usize,

    /// QoS level the transport should subscribe with (0..=2)
    pub subscribe_qos: u8,

    /// QoS level the transport should publish commands with (0..=2)
    pub publish_qos: u8,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            worker_count: 4,
            retention_days: 7,
            retention_interval: Duration::from_secs(24 * 60 * 60),
            subscriber_buffer: 100,
            subscribe_qos: 1,
            publish_qos: 1,
        }
    }
}

impl ReceiverConfig {
    /// Set the ingest queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the number of persistence workers
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the history retention window in days
    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Set the retention sweep interval
    pub fn retention_interval(mut self, interval: Duration) -> Self {
        self.retention_interval = interval;
        self
    }

    /// Set the per-subscriber output buffer capacity
    pub fn subscriber_buffer(mut self, capacity: usize) -> Self {
        self.subscriber_buffer = capacity;
        self
    }

    /// Set the subscribe QoS level
    pub fn subscribe_qos(mut self, qos: u8) -> Self {
        self.subscribe_qos = qos;
        self
    }

    /// Set the publish QoS level
    pub fn publish_qos(mut self, qos: u8) -> Self {
        self.publish_qos = qos;
        self
    }

    /// Validate the configuration
    ///
    /// Called once at startup; a rejected configuration is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be > 0".into()));
        }
        if self.worker_count == 0 {
            return Err(Error::InvalidConfig("worker_count must be > 0".into()));
        }
        if self.retention_days == 0 {
            return Err(Error::InvalidConfig("retention_days must be >= 1".into()));
        }
        if self.subscriber_buffer == 0 {
            return Err(Error::InvalidConfig("subscriber_buffer must be > 0".into()));
        }
        if self.subscribe_qos > MAX_QOS {
            return Err(Error::InvalidConfig(format!(
                "subscribe_qos must be 0..=2, got {}",
                self.subscribe_qos
            )));
        }
        if self.publish_qos > MAX_QOS {
            return Err(Error::InvalidConfig(format!(
                "publish_qos must be 0..=2, got {}",
                self.publish_qos
            )));
        }
        Ok(())
    }
}
