//! Storage operations the model can request.
//!
//! `execute` never fails: store errors and bad arguments come back as an
//! unsuccessful [`OperationOutcome`] so the model can react to them.

use crate::decision::ToolArgs;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use todoclaw_core::event::{DomainEvent, EventBus};
use todoclaw_core::todo::TodoStore;
use todoclaw_core::tool::ToolName;
use tracing::{debug, warn};

/// Result of one storage operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub output: String,
}

impl OperationOutcome {
    fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Dispatches tool names to the todo store.
pub struct TodoOperations {
    store: Arc<dyn TodoStore>,
    event_bus: Option<Arc<EventBus>>,
}

impl TodoOperations {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self {
            store,
            event_bus: None,
        }
    }

    /// Publish a `ToolExecuted` event for every operation.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn store(&self) -> &Arc<dyn TodoStore> {
        &self.store
    }

    /// Run `tool` with `args`.
    pub async fn execute(&self, tool: &str, args: Option<&ToolArgs>) -> OperationOutcome {
        let start = Instant::now();

        let args = args.filter(|a| !a.is_empty());
        let outcome = match (tool.parse::<ToolName>(), args) {
            (Ok(ToolName::GetAllTodos), _) => self.get_all_todos().await,
            (Ok(ToolName::CreateTodos), Some(args)) => self.create_todos(args).await,
            (Ok(ToolName::DeleteTodos), Some(args)) => self.delete_todos(args).await,
            (Ok(ToolName::DeleteTodosById), Some(args)) => self.delete_todos_by_id(args).await,
            _ => invalid_call(tool),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            tool = %tool,
            success = outcome.success,
            duration_ms,
            "Storage operation finished"
        );

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ToolExecuted {
                tool_name: tool.to_string(),
                success: outcome.success,
                duration_ms,
                timestamp: Utc::now(),
            });
        }

        outcome
    }

    async fn get_all_todos(&self) -> OperationOutcome {
        match self.store.list().await {
            Ok(todos) if todos.is_empty() => OperationOutcome::ok("No todos found"),
            Ok(todos) => {
                let listing: Vec<String> = todos
                    .iter()
                    .map(|t| format!("ID: {} - Task: '{}'", t.id, t.task))
                    .collect();
                OperationOutcome::ok(format!("Current todos: {listing:?}"))
            }
            Err(e) => {
                warn!(error = %e, "Listing todos failed");
                OperationOutcome::failed(format!("Error executing get_all_todos: {e}"))
            }
        }
    }

    async fn create_todos(&self, args: &ToolArgs) -> OperationOutcome {
        let task = args.to_string();
        match self.store.create(task.trim()).await {
            Ok(Some(id)) => {
                debug!(todo_id = id, "Created todo");
                OperationOutcome::ok(format!("Successfully created todo: '{task}' (ID: {id})"))
            }
            Ok(None) => OperationOutcome::failed(format!("Failed to create todo: '{task}'")),
            Err(e) => {
                warn!(error = %e, "Creating todo failed");
                OperationOutcome::failed(format!("Failed to create todo '{task}': {e}"))
            }
        }
    }

    async fn delete_todos(&self, args: &ToolArgs) -> OperationOutcome {
        let needle = args.to_string();
        match self.store.delete_matching(needle.trim()).await {
            Ok(true) => OperationOutcome::ok(format!("Successfully deleted todo: '{needle}'")),
            Ok(false) => {
                OperationOutcome::failed(format!("Todo '{needle}' not found - nothing was deleted"))
            }
            Err(e) => {
                warn!(error = %e, "Deleting todo by match failed");
                OperationOutcome::failed(format!("Failed to delete todo '{needle}': {e}"))
            }
        }
    }

    async fn delete_todos_by_id(&self, args: &ToolArgs) -> OperationOutcome {
        let Some(id) = args.as_id() else {
            return OperationOutcome::failed(format!("Invalid task ID: {args}"));
        };

        match self.store.delete_by_id(id).await {
            Ok(true) => OperationOutcome::ok(format!("Successfully deleted todo with ID: {id}")),
            Ok(false) => OperationOutcome::failed(format!(
                "Todo with ID {id} not found - nothing was deleted"
            )),
            Err(e) => {
                warn!(error = %e, todo_id = id, "Deleting todo by id failed");
                OperationOutcome::failed(format!("Failed to delete todo with ID {id}: {e}"))
            }
        }
    }
}

fn invalid_call(tool: &str) -> OperationOutcome {
    OperationOutcome::failed(format!("Invalid tool '{tool}' or missing arguments"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use todoclaw_core::error::StoreError;
    use todoclaw_core::todo::Todo;
    use todoclaw_store::InMemoryTodoStore;

    fn ops() -> (TodoOperations, InMemoryTodoStore) {
        let store = InMemoryTodoStore::new();
        (TodoOperations::new(Arc::new(store.clone())), store)
    }

    fn text(s: &str) -> ToolArgs {
        ToolArgs::Text(s.into())
    }

    #[tokio::test]
    async fn list_empty_store() {
        let (ops, _) = ops();
        let outcome = ops.execute("get_all_todos", None).await;
        assert_eq!(outcome, OperationOutcome::ok("No todos found"));
    }

    #[tokio::test]
    async fn list_ignores_args() {
        let (ops, store) = ops();
        store.create("buy milk").await.unwrap();
        let outcome = ops.execute("get_all_todos", Some(&text("whatever"))).await;
        assert!(outcome.success);
        assert_eq!(outcome.output, r#"Current todos: ["ID: 1 - Task: 'buy milk'"]"#);
    }

    #[tokio::test]
    async fn create_reports_id() {
        let (ops, store) = ops();
        let outcome = ops.execute("create_todos", Some(&text("buy milk"))).await;
        assert_eq!(
            outcome,
            OperationOutcome::ok("Successfully created todo: 'buy milk' (ID: 1)")
        );
        assert_eq!(store.list().await.unwrap()[0].task, "buy milk");
    }

    #[tokio::test]
    async fn create_with_empty_args_rejected() {
        let (ops, store) = ops();
        for args in [None, Some(text("")), Some(text("   "))] {
            let outcome = ops.execute("create_todos", args.as_ref()).await;
            assert_eq!(
                outcome,
                OperationOutcome::failed("Invalid tool 'create_todos' or missing arguments")
            );
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_by_text_removes_first_match_only() {
        let (ops, store) = ops();
        store.create("go to market").await.unwrap();
        store.create("go to mall").await.unwrap();

        let outcome = ops.execute("delete_todos", Some(&text("market"))).await;
        assert_eq!(outcome, OperationOutcome::ok("Successfully deleted todo: 'market'"));

        let remaining = store.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].task, "go to mall");
    }

    #[tokio::test]
    async fn delete_by_text_not_found() {
        let (ops, _) = ops();
        let outcome = ops.execute("delete_todos", Some(&text("eggs"))).await;
        assert_eq!(
            outcome,
            OperationOutcome::failed("Todo 'eggs' not found - nothing was deleted")
        );
    }

    #[tokio::test]
    async fn delete_by_id_accepts_lists_and_text() {
        let (ops, store) = ops();
        store.create("one").await.unwrap();
        store.create("two").await.unwrap();

        let outcome = ops
            .execute("delete_todos_by_id", Some(&ToolArgs::IdList(vec![1, 2])))
            .await;
        assert_eq!(outcome, OperationOutcome::ok("Successfully deleted todo with ID: 1"));

        let outcome = ops.execute("delete_todos_by_id", Some(&text("2"))).await;
        assert!(outcome.success);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_by_invalid_id() {
        let (ops, store) = ops();
        store.create("buy milk").await.unwrap();

        let outcome = ops.execute("delete_todos_by_id", Some(&text("abc"))).await;
        assert_eq!(outcome, OperationOutcome::failed("Invalid task ID: abc"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_by_missing_id() {
        let (ops, _) = ops();
        let outcome = ops
            .execute("delete_todos_by_id", Some(&ToolArgs::IdList(vec![9])))
            .await;
        assert_eq!(
            outcome,
            OperationOutcome::failed("Todo with ID 9 not found - nothing was deleted")
        );
    }

    #[tokio::test]
    async fn unknown_tool() {
        let (ops, _) = ops();
        let outcome = ops.execute("drop_table", Some(&text("todos"))).await;
        assert_eq!(
            outcome,
            OperationOutcome::failed("Invalid tool 'drop_table' or missing arguments")
        );
    }

    struct BrokenStore;

    #[async_trait]
    impl TodoStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }
        async fn list(&self) -> Result<Vec<Todo>, StoreError> {
            Err(StoreError::QueryFailed("disk on fire".into()))
        }
        async fn create(&self, _task: &str) -> Result<Option<i64>, StoreError> {
            Err(StoreError::Storage("read-only".into()))
        }
        async fn delete_matching(&self, _needle: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn delete_by_id(&self, _id: i64) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn store_errors_become_failed_outcomes() {
        let ops = TodoOperations::new(Arc::new(BrokenStore));

        let outcome = ops.execute("get_all_todos", None).await;
        assert!(!outcome.success);
        assert!(outcome.output.contains("disk on fire"));

        let outcome = ops.execute("create_todos", Some(&text("buy milk"))).await;
        assert!(!outcome.success);
        assert!(outcome.output.starts_with("Failed to create todo 'buy milk'"));
    }

    #[tokio::test]
    async fn publishes_tool_events() {
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let ops = TodoOperations::new(Arc::new(InMemoryTodoStore::new())).with_event_bus(bus);

        ops.execute("create_todos", Some(&text("call mom"))).await;

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "create_todos");
                assert!(success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
