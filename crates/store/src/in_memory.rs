//! In-memory store, for tests and throwaway sessions.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use todoclaw_core::error::StoreError;
use todoclaw_core::todo::{Todo, TodoStore};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    todos: Vec<Todo>,
    last_id: i64,
}

/// A store that keeps todos in a Vec, ordered by id.
#[derive(Clone, Default)]
pub struct InMemoryTodoStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        Ok(self.state.read().await.todos.clone())
    }

    async fn create(&self, task: &str) -> Result<Option<i64>, StoreError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let now = Utc::now();
        let todo = Todo {
            id: state.last_id,
            task: task.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.todos.push(todo);
        Ok(Some(state.last_id))
    }

    async fn delete_matching(&self, needle: &str) -> Result<bool, StoreError> {
        let needle = needle.to_lowercase();
        let mut state = self.state.write().await;
        match state
            .todos
            .iter()
            .position(|t| t.task.to_lowercase().contains(&needle))
        {
            Some(idx) => {
                state.todos.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.todos.len();
        state.todos.retain(|t| t.id != id);
        Ok(state.todos.len() < before)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().await.todos.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_increasing_and_never_reused() {
        let store = InMemoryTodoStore::new();
        let a = store.create("one").await.unwrap().unwrap();
        let b = store.create("two").await.unwrap().unwrap();
        assert!(b > a);

        assert!(store.delete_by_id(b).await.unwrap());
        let c = store.create("three").await.unwrap().unwrap();
        assert!(c > b);
    }

    #[tokio::test]
    async fn delete_matching_removes_first_match_only() {
        let store = InMemoryTodoStore::new();
        store.create("go to market").await.unwrap();
        store.create("go to mall").await.unwrap();

        assert!(store.delete_matching("GO TO").await.unwrap());
        let remaining = store.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].task, "go to mall");
    }

    #[tokio::test]
    async fn delete_missing_reports_false() {
        let store = InMemoryTodoStore::new();
        store.create("buy milk").await.unwrap();
        assert!(!store.delete_matching("eggs").await.unwrap());
        assert!(!store.delete_by_id(42).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryTodoStore::new();
        let handle = store.clone();
        store.create("walk the dog").await.unwrap();
        assert_eq!(handle.list().await.unwrap()[0].task, "walk the dog");
    }
}
