//! End-to-end tests for the todo agent.
//!
//! These drive the full pipeline: a scripted provider behind the real
//! `ProviderInvoker`, the PLAN/CONTINUE/OUTPUT loop, a real store, and the
//! HTTP gateway on top.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use todoclaw_agent::{ProviderInvoker, RunStatus, StepRecord, TodoAgent};
use todoclaw_core::error::ProviderError;
use todoclaw_core::message::Message;
use todoclaw_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use todoclaw_core::todo::TodoStore;
use todoclaw_gateway::{GatewayState, build_router};
use todoclaw_store::{InMemoryTodoStore, SqliteTodoStore};

// ── Mock Provider ────────────────────────────────────────────────────────

/// Returns scripted replies in order and keeps every prompt it was sent.
struct ScriptedProvider {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<&str>) -> Arc<Self> {
        Self::with_results(responses.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    fn with_results(responses: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request.messages[0].content.clone();
        let mut prompts = self.prompts.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = prompts.len();
        prompts.push(prompt);

        let reply = responses.get(index).cloned().unwrap_or_else(|| {
            panic!(
                "ScriptedProvider exhausted: call #{index}, have {}",
                responses.len()
            )
        })?;
        Ok(ProviderResponse {
            message: Message::assistant(reply),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
        })
    }
}

fn agent(provider: Arc<ScriptedProvider>, store: Arc<dyn TodoStore>) -> TodoAgent {
    let invoker = ProviderInvoker::new(provider, "scripted-model").with_temperature(0.0);
    TodoAgent::new(Arc::new(invoker), store)
}

async fn sqlite_store() -> Arc<dyn TodoStore> {
    Arc::new(SqliteTodoStore::new("sqlite::memory:").await.unwrap())
}

// ── Agent pipeline ───────────────────────────────────────────────────────

#[tokio::test]
async fn add_buy_milk_single_step() {
    let provider = ScriptedProvider::new(vec![
        r#"```json
{"PLAN": {"reasoning": "user wants a todo", "tool": "create_todos", "args": "buy milk", "is_multi_step": false}}
```"#,
        r#"{"OUTPUT": {"message": "Added 'buy milk' to your list.", "action_taken": "created todo 1"}}"#,
    ]);
    let store = sqlite_store().await;
    let agent = agent(provider.clone(), store.clone());

    let run = agent.run("add buy milk").await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.message, "Added 'buy milk' to your list.");
    assert_eq!(run.iterations, 2);
    assert_eq!(provider.calls(), 2);

    let todos = store.list().await.unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].task, "buy milk");

    let first = provider.prompt(0);
    assert!(first.ends_with("User input: add buy milk\n"));

    let second = provider.prompt(1);
    assert!(second.contains("You planned: {"));
    assert!(second.contains("Database operation success: true"));
    assert!(second.contains("Database result: Successfully created todo: 'buy milk' (ID: 1)"));
}

#[tokio::test]
async fn remove_market_multi_step() {
    let store = sqlite_store().await;
    store.create("go to market").await.unwrap();
    store.create("call mom").await.unwrap();

    let provider = ScriptedProvider::new(vec![
        r#"{"PLAN": {"tool": "get_all_todos", "args": "", "is_multi_step": true}}"#,
        r#"{"CONTINUE": {"tool": "delete_todos_by_id", "args": [1], "is_final_step": true}}"#,
        r#"{"OUTPUT": {"message": "Removed the market todo."}}"#,
    ]);
    let agent = agent(provider.clone(), store.clone());

    let run = agent.run("remove the market one").await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.message, "Removed the market todo.");
    assert_eq!(provider.calls(), 3);

    let second = provider.prompt(1);
    assert!(second.contains("Previous operation: get_all_todos()\n"));
    assert!(second.contains("ID: 1 - Task: 'go to market'"));

    let third = provider.prompt(2);
    assert!(third.contains("Final operation: delete_todos_by_id(1)\n"));
    assert!(third.contains("Operation result: Successfully deleted todo with ID: 1"));

    let remaining = store.list().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].task, "call mom");

    let kinds: Vec<&str> = run
        .steps
        .iter()
        .map(|s| match s {
            StepRecord::Plan { .. } => "plan",
            StepRecord::Continue { .. } => "continue",
            StepRecord::Output { .. } => "output",
            StepRecord::Undecodable { .. } => "undecodable",
        })
        .collect();
    assert_eq!(kinds, ["plan", "continue", "output"]);
}

#[tokio::test]
async fn concatenated_message_is_repaired() {
    let provider = ScriptedProvider::new(vec![
        r#"{"OUTPUT": {"message": "Your todos:" + "\n".join(["1. buy milk", "2. call mom"])}}"#,
    ]);
    let agent = agent(provider, Arc::new(InMemoryTodoStore::new()));

    let reply = agent.process_request("what's on my list?").await;
    assert_eq!(reply, "Your todos:\n1. buy milk\n2. call mom");
}

#[tokio::test]
async fn undecodable_reply_is_retried() {
    let provider = ScriptedProvider::new(vec![
        "Sure! Let me think about that.",
        r#"{"OUTPUT": {"message": "That doesn't sound like a todo task to me."}}"#,
    ]);
    let agent = agent(provider.clone(), Arc::new(InMemoryTodoStore::new()));

    let run = agent.run("there is a tree in my street").await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(provider.calls(), 2);
    assert_eq!(provider.prompt(0), provider.prompt(1));
    assert!(matches!(run.steps[0], StepRecord::Undecodable { .. }));
}

#[tokio::test]
async fn provider_failure_surfaces_as_message() {
    let provider = ScriptedProvider::with_results(vec![Err(ProviderError::RateLimited {
        retry_after_secs: 30,
    })]);
    let store = Arc::new(InMemoryTodoStore::new());
    let agent = agent(provider, store.clone());

    let run = agent.run("add buy milk").await;

    assert_eq!(run.status, RunStatus::ModelError);
    assert!(run.message.starts_with("Error processing request:"));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn endless_planning_hits_step_budget() {
    let plan = r#"{"PLAN": {"tool": "get_all_todos", "is_multi_step": true}}"#;
    let provider = ScriptedProvider::new(vec![plan, plan, plan]);
    let agent = agent(provider.clone(), Arc::new(InMemoryTodoStore::new())).with_max_iterations(3);

    let run = agent.run("list everything forever").await;

    assert_eq!(run.status, RunStatus::Exhausted);
    assert_eq!(
        run.message,
        "The operation took too many steps. Please try breaking it down into simpler requests."
    );
    assert_eq!(provider.calls(), 3);
}

// ── Gateway ──────────────────────────────────────────────────────────────

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_todo(uri: &str, input: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "user_input": input }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn gateway_add_then_list() {
    let provider = ScriptedProvider::new(vec![
        r#"{"PLAN": {"tool": "create_todos", "args": "buy milk", "is_multi_step": false}}"#,
        r#"{"OUTPUT": {"message": "Added 'buy milk'."}}"#,
    ]);
    let store = sqlite_store().await;
    let agent = Arc::new(agent(provider, store));
    let app = build_router(
        Arc::new(GatewayState::new(agent)),
        &["http://localhost:3000".to_string()],
    );

    let response = app
        .clone()
        .oneshot(post_todo("/api/v1/todo/todo", "add buy milk"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Added 'buy milk'.");
    assert_eq!(body["success"], true);

    let response = app
        .oneshot(Request::get("/todos").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["todos"][0]["task"], "buy milk");
}

#[tokio::test]
async fn gateway_rejects_blank_input_without_calling_model() {
    let provider = ScriptedProvider::new(vec![]);
    let agent = Arc::new(agent(provider.clone(), Arc::new(InMemoryTodoStore::new())));
    let app = build_router(Arc::new(GatewayState::new(agent)), &[]);

    let response = app.oneshot(post_todo("/todo", "   ")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "User input cannot be empty");
    assert_eq!(provider.calls(), 0);
}
