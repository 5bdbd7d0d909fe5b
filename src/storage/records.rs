//! Durable record types

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Latest known value for one device parameter
///
/// Exactly one row exists per `(device, parameter)` pair; it is overwritten
/// in place as newer values arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentValue {
    pub device: String,
    pub parameter: String,
    pub value: String,
    /// UTC milliseconds
    pub updated_at_ms: i64,
}

impl CurrentValue {
    pub(super) fn from_row(row: &SqliteRow) -> Self {
        Self {
            device: row.get("device"),
            parameter: row.get("parameter"),
            value: row.get("value"),
            updated_at_ms: row.get("updated_at"),
        }
    }
}

/// One append-only history row
///
/// Written once per successfully persisted event, never updated, removed
/// only by retention pruning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub device: String,
    pub parameter: String,
    pub value: String,
    /// UTC milliseconds
    pub timestamp_ms: i64,
}

impl HistoryRecord {
    pub(super) fn from_row(row: &SqliteRow) -> Self {
        Self {
            device: row.get("device"),
            parameter: row.get("parameter"),
            value: row.get("value"),
            timestamp_ms: row.get("timestamp"),
        }
    }
}
