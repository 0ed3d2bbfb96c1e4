//! SQLite todo store.
//!
//! One `todos` table. Ids come from `AUTOINCREMENT`, so a deleted id is
//! never handed out again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use todoclaw_core::error::StoreError;
use todoclaw_core::todo::{Todo, TodoStore};
use tracing::{debug, info};

/// A SQLite-backed todo store.
pub struct SqliteTodoStore {
    pool: SqlitePool,
}

impl SqliteTodoStore {
    /// Open (or create) the database at `url`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite todo store initialized at {url}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS todos (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                task        TEXT NOT NULL CHECK (length(task) > 0),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("todos table: {e}")))?;

        Ok(())
    }

    fn row_to_todo(row: &sqlx::sqlite::SqliteRow) -> Result<Todo, StoreError> {
        let read = |e: sqlx::Error| StoreError::QueryFailed(format!("todo row: {e}"));
        Ok(Todo {
            id: row.try_get("id").map_err(read)?,
            task: row.try_get("task").map_err(read)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(read)?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(read)?,
        })
    }
}

#[async_trait]
impl TodoStore for SqliteTodoStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let rows = sqlx::query("SELECT id, task, created_at, updated_at FROM todos ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT todos: {e}")))?;

        rows.iter().map(Self::row_to_todo).collect()
    }

    async fn create(&self, task: &str) -> Result<Option<i64>, StoreError> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO todos (task, created_at, updated_at) VALUES (?1, ?2, ?2)")
            .bind(task)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(todo_id = id, "Inserted todo");
        Ok((result.rows_affected() > 0).then_some(id))
    }

    async fn delete_matching(&self, needle: &str) -> Result<bool, StoreError> {
        // SQLite LIKE only folds ASCII case, so matching happens here.
        let needle = needle.to_lowercase();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        let rows = sqlx::query("SELECT id, task FROM todos ORDER BY id")
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT for match failed: {e}")))?;

        let mut matched = None;
        for row in &rows {
            let task: String = row
                .try_get("task")
                .map_err(|e| StoreError::QueryFailed(format!("task column: {e}")))?;
            if task.to_lowercase().contains(&needle) {
                let id: i64 = row
                    .try_get("id")
                    .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
                matched = Some(id);
                break;
            }
        }

        let Some(id) = matched else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM todos WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE by match failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(todo_id = id, "Deleted todo by match");
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM todos")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}
