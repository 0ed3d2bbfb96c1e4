//! Todo records and the store trait behind the four storage operations.
//!
//! The store exclusively owns record identity and timestamps: callers hand
//! it task text and get back generated ids, never the other way around.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A single todo record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    /// Store-generated identifier
    pub id: i64,

    /// The task text (never empty)
    pub task: String,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

/// The core TodoStore trait.
///
/// Implementations: SQLite, PostgreSQL, in-memory (for testing).
///
/// Every method is atomic, and its effect is visible to the
/// next call on the same store.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "postgres", "in_memory").
    fn name(&self) -> &str;

    /// All todos in ascending id order.
    async fn list(&self) -> std::result::Result<Vec<Todo>, StoreError>;

    /// Insert a new todo. Returns the generated id, or `None` when the
    /// backend did not report one.
    async fn create(&self, task: &str) -> std::result::Result<Option<i64>, StoreError>;

    /// Delete the first todo (ascending id) whose task contains `needle`,
    /// compared case-insensitively. Later matches are left untouched.
    async fn delete_matching(&self, needle: &str) -> std::result::Result<bool, StoreError>;

    /// Delete a todo by id.
    async fn delete_by_id(&self, id: i64) -> std::result::Result<bool, StoreError>;

    /// Number of stored todos.
    async fn count(&self) -> std::result::Result<usize, StoreError> {
        Ok(self.list().await?.len())
    }
}
