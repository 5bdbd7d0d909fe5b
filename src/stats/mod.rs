//! Pipeline statistics

pub mod metrics;

pub use metrics::{LatencyHistogram, LatencySnapshot, PipelineStats, StatsSnapshot};
