//! SQLite storage engine
//!
//! Owns the durable current-value table and the append-only history table.
//! The pool is capped at one connection, so every write is serialized by
//! the store itself rather than by an application-level lock; callers
//! tolerate commit latency as normal operation. WAL journaling keeps crash
//! recovery cheap: the current-value table never has to be re-derived from
//! history.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqliteConnection;

use crate::error::Result;

use super::records::{CurrentValue, HistoryRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS current_values (
    device     TEXT NOT NULL,
    parameter  TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (device, parameter)
);

CREATE TABLE IF NOT EXISTS history (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    device    TEXT NOT NULL,
    parameter TEXT NOT NULL,
    value     TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_key_ts
    ON history (device, parameter, timestamp);

CREATE INDEX IF NOT EXISTS idx_history_ts
    ON history (timestamp);
"#;

/// Transactional store for current values and history
pub struct StorageEngine {
    pool: SqlitePool,
}

impl StorageEngine {
    /// Open (or create) the database file and apply the schema
    ///
    /// Configures WAL journaling with a bounded journal size, normal
    /// synchronous mode, and a 5s busy timeout.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .pragma("journal_size_limit", "1000000")
            .pragma("cache_size", "-10000");

        // Single write connection; concurrent save_value calls serialize
        // here instead of failing with SQLITE_BUSY.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;

        tracing::info!(
            db_file = %path.as_ref().display(),
            "Database initialized with WAL mode"
        );

        Ok(Self { pool })
    }

    /// Open an in-memory database (for tests and demos)
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(pool).await?;
        Ok(())
    }

    /// Persist one telemetry value
    ///
    /// In one atomic transaction: upsert the current-value row for
    /// `(device, parameter)` and append a history row with the same value
    /// and timestamp. Either both commit or neither does. Returns the
    /// commit timestamp (UTC milliseconds).
    pub async fn save_value(&self, device: &str, parameter: &str, value: &str) -> Result<i64> {
        let now = Utc::now().timestamp_millis();

        let mut tx = self.pool.begin().await?;
        upsert_current(&mut *tx, device, parameter, value, now).await?;
        append_history(&mut *tx, device, parameter, value, now).await?;
        tx.commit().await?;

        Ok(now)
    }

    /// Latest known value for a point, if any
    pub async fn get_current(&self, device: &str, parameter: &str) -> Result<Option<CurrentValue>> {
        let row = sqlx::query(
            "SELECT device, parameter, value, updated_at \
             FROM current_values WHERE device = ? AND parameter = ?",
        )
        .bind(device)
        .bind(parameter)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(CurrentValue::from_row))
    }

    /// History rows for one point with `timestamp` in `[start_ms, end_ms]`,
    /// ascending by timestamp
    ///
    /// An empty range yields an empty vec, not an error.
    pub async fn get_history(
        &self,
        device: &str,
        parameter: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            "SELECT device, parameter, value, timestamp \
             FROM history \
             WHERE device = ? AND parameter = ? AND timestamp BETWEEN ? AND ? \
             ORDER BY timestamp ASC",
        )
        .bind(device)
        .bind(parameter)
        .bind(start_ms)
        .bind(end_ms)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(HistoryRecord::from_row).collect())
    }

    /// Delete history rows older than the retention window
    ///
    /// Current values are never touched. Returns the number of rows removed.
    pub async fn clean_old_history(&self, retention_days: u32) -> Result<u64> {
        let cutoff = (Utc::now() - chrono::Duration::days(retention_days as i64))
            .timestamp_millis();

        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM history WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        Ok(deleted)
    }

    /// Spawn the periodic retention sweep
    ///
    /// Failures are logged and the schedule continues; history simply grows
    /// until the next successful run. Returns a handle that can be used to
    /// abort the task.
    pub fn spawn_retention_task(
        self: &Arc<Self>,
        retention_days: u32,
        period: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let storage = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; wait a full period.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                tracing::info!(retention_days = retention_days, "Starting history cleanup");
                match storage.clean_old_history(retention_days).await {
                    Ok(deleted) => {
                        tracing::info!(deleted = deleted, "Old history cleaned");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to clean old history");
                    }
                }
            }
        })
    }

    /// Checkpoint the WAL and close the pool
    ///
    /// The checkpoint is best-effort; a failure still closes cleanly.
    pub async fn close(&self) {
        let _ = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await;
        self.pool.close().await;
    }
}

/// Upsert the current-value row inside an open transaction
///
/// Creates the row on first sight of the key; otherwise overwrites when the
/// value differs or the stored timestamp is not after the new one. An event
/// older than the stored row leaves the current value alone (history still
/// records it).
async fn upsert_current(
    conn: &mut SqliteConnection,
    device: &str,
    parameter: &str,
    value: &str,
    now_ms: i64,
) -> Result<()> {
    let existing: Option<(String, i64)> = sqlx::query_as(
        "SELECT value, updated_at FROM current_values WHERE device = ? AND parameter = ?",
    )
    .bind(device)
    .bind(parameter)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        None => {
            sqlx::query(
                "INSERT INTO current_values (device, parameter, value, updated_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(device)
            .bind(parameter)
            .bind(value)
            .bind(now_ms)
            .execute(&mut *conn)
            .await?;
        }
        Some((ref stored_value, stored_at)) if stored_value != value || stored_at <= now_ms => {
            sqlx::query(
                "UPDATE current_values SET value = ?, updated_at = ? \
                 WHERE device = ? AND parameter = ?",
            )
            .bind(value)
            .bind(now_ms)
            .bind(device)
            .bind(parameter)
            .execute(&mut *conn)
            .await?;
        }
        Some(_) => {}
    }

    Ok(())
}

/// Append one history row inside an open transaction
async fn append_history(
    conn: &mut SqliteConnection,
    device: &str,
    parameter: &str,
    value: &str,
    timestamp_ms: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO history (device, parameter, value, timestamp) VALUES (?, ?, ?, ?)",
    )
    .bind(device)
    .bind(parameter)
    .bind(value)
    .bind(timestamp_ms)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn engine() -> StorageEngine {
        StorageEngine::open_in_memory().await.unwrap()
    }

    /// Append a history row at an arbitrary timestamp, bypassing save_value
    async fn insert_history_at(engine: &StorageEngine, ts_ms: i64) {
        let mut tx = engine.pool.begin().await.unwrap();
        append_history(&mut *tx, "boiler", "temperature", "1", ts_ms)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_creates_current_and_history() {
        let engine = engine().await;

        let ts = engine
            .save_value("boiler", "temperature", "21.5")
            .await
            .unwrap();

        let current = engine
            .get_current("boiler", "temperature")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.value, "21.5");
        assert_eq!(current.updated_at_ms, ts);

        let history = engine
            .get_history("boiler", "temperature", 0, i64::MAX)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].value, "21.5");
        assert_eq!(history[0].timestamp_ms, ts);
    }

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let engine = engine().await;

        for value in ["1", "2", "3"] {
            engine.save_value("pump", "rpm", value).await.unwrap();
        }

        let current = engine.get_current("pump", "rpm").await.unwrap().unwrap();
        assert_eq!(current.value, "3");

        // One current row, three history rows
        let history = engine.get_history("pump", "rpm", 0, i64::MAX).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.iter().map(|h| h.value.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let engine = engine().await;

        engine.save_value("boiler", "temperature", "20").await.unwrap();
        engine.save_value("boiler", "pressure", "3.1").await.unwrap();
        engine.save_value("pump", "temperature", "45").await.unwrap();

        let t = engine.get_current("boiler", "temperature").await.unwrap().unwrap();
        let p = engine.get_current("boiler", "pressure").await.unwrap().unwrap();
        assert_eq!(t.value, "20");
        assert_eq!(p.value, "3.1");

        let history = engine
            .get_history("boiler", "temperature", 0, i64::MAX)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_leaves_no_partial_write() {
        let engine = engine().await;

        // Current-value step succeeds, then the transaction aborts before
        // the history append commits.
        let mut tx = engine.pool.begin().await.unwrap();
        upsert_current(&mut *tx, "boiler", "temperature", "99", 1_000)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(engine
            .get_current("boiler", "temperature")
            .await
            .unwrap()
            .is_none());
        assert!(engine
            .get_history("boiler", "temperature", 0, i64::MAX)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_history_range_query_inclusive_ascending() {
        let engine = engine().await;

        for ts in [100, 200, 300] {
            insert_history_at(&engine, ts).await;
        }

        let records = engine
            .get_history("boiler", "temperature", 150, 300)
            .await
            .unwrap();
        assert_eq!(
            records.iter().map(|r| r.timestamp_ms).collect::<Vec<_>>(),
            vec![200, 300]
        );

        // Empty range is empty, not an error
        let none = engine
            .get_history("boiler", "temperature", 400, 500)
            .await
            .unwrap();
        assert!(none.is_empty());

        // Other keys don't leak in
        let other = engine
            .get_history("pump", "rpm", 0, i64::MAX)
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_retention_prunes_only_expired_history() {
        let engine = engine().await;
        let now = Utc::now().timestamp_millis();
        let day = 24 * 60 * 60 * 1000i64;

        insert_history_at(&engine, now - 10 * day).await;
        insert_history_at(&engine, now - 6 * day).await;
        insert_history_at(&engine, now - day / 24).await; // one hour ago

        engine.save_value("boiler", "temperature", "21").await.unwrap();

        let deleted = engine.clean_old_history(7).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = engine
            .get_history("boiler", "temperature", 0, i64::MAX)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 3);

        // Current values are untouched by pruning
        assert!(engine
            .get_current("boiler", "temperature")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_close_is_clean() {
        let engine = engine().await;
        engine.save_value("boiler", "temperature", "21").await.unwrap();
        engine.close().await;
    }
}
