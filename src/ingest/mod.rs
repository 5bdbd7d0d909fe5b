//! Ingestion pipeline
//!
//! This module provides:
//! - [`TelemetryEvent`], the transient queue payload
//! - [`IngestGate`], the non-blocking entry point for the listener callback
//! - [`IngestQueue`], the shared consumer side of the bounded queue
//! - [`WorkerPool`], the fixed pool of persistence workers

pub mod event;
pub mod gate;
pub mod worker;

pub use event::TelemetryEvent;
pub use gate::{ingest_channel, IngestGate, IngestQueue};
pub use worker::WorkerPool;
