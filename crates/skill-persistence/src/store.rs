//! SQLite-backed checkpoint storage, grounded on the teacher's
//! `SqliteJobStorage` connection-pool setup.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::CheckpointRecord;

/// Errors writing or reading checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or initialized.
    #[error("connection error: {0}")]
    Connection(String),
    /// A query against the backend failed.
    #[error("database error: {0}")]
    Database(String),
}

/// Abstraction over the checkpoint backend, so the worker loop isn't tied
/// to SQLite specifically.
#[async_trait]
pub trait CheckpointStore: Send + Sync + 'static {
    /// Backend identifier, used in log lines.
    fn backend_name(&self) -> &'static str;
    /// Creates the schema if it does not already exist.
    async fn setup(&self) -> Result<(), StoreError>;
    /// Persists one checkpoint record.
    async fn save(&self, record: &CheckpointRecord) -> Result<(), StoreError>;
    /// Returns the most recent checkpoints for a thread, newest first.
    async fn latest(&self, thread_id: &str, limit: i64) -> Result<Vec<CheckpointRecord>, StoreError>;
}

/// SQLite-backed implementation of [`CheckpointStore`].
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// Opens (creating if needed) a SQLite database at `path`, or an
    /// in-memory database when `path` is `":memory:"`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let url = if path.as_os_str() == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Connection(format!("failed to create directory: {e}")))?;
            }
            format!("sqlite:{}?mode=rwc", path.display())
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn setup(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT NOT NULL,
                step INTEGER NOT NULL,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (thread_id, step)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn save(&self, record: &CheckpointRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints (thread_id, step, state, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.thread_id)
        .bind(record.step)
        .bind(record.state.to_string())
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn latest(&self, thread_id: &str, limit: i64) -> Result<Vec<CheckpointRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT thread_id, step, state, created_at FROM checkpoints \
             WHERE thread_id = ? ORDER BY step DESC LIMIT ?",
        )
        .bind(thread_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let state_text: String = row.try_get("state").map_err(|e| StoreError::Database(e.to_string()))?;
                let created_at_text: String =
                    row.try_get("created_at").map_err(|e| StoreError::Database(e.to_string()))?;
                Ok(CheckpointRecord {
                    thread_id: row.try_get("thread_id").map_err(|e| StoreError::Database(e.to_string()))?,
                    step: row.try_get("step").map_err(|e| StoreError::Database(e.to_string()))?,
                    state: serde_json::from_str(&state_text).unwrap_or(serde_json::Value::Null),
                    created_at: created_at_text
                        .parse()
                        .unwrap_or_else(|_| chrono::Utc::now()),
                })
            })
            .collect()
    }
}
