//! Durable storage for current values and history
//!
//! This module provides:
//! - The SQLite-backed [`StorageEngine`] with atomic upsert-and-append
//! - The [`CurrentValue`] and [`HistoryRecord`] row types
//! - The periodic retention sweep

pub mod engine;
pub mod records;

pub use engine::StorageEngine;
pub use records::{CurrentValue, HistoryRecord};
