//! HTTP API gateway for todoclaw.
//!
//! - `POST /todo` runs one natural-language request through the agent
//! - `GET /todos` lists the store
//! - `GET /health` reports liveness
//!
//! The todo routes are also mounted under `/api/v1/todo` for the web
//! frontend. Built on Axum.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use todoclaw_agent::{ProviderInvoker, TodoAgent};
use todoclaw_core::error::ProviderError;
use todoclaw_core::todo::TodoStore;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<TodoAgent>,
    pub store: Arc<dyn TodoStore>,
}

impl GatewayState {
    /// The agent's own store backs `GET /todos`.
    pub fn new(agent: Arc<TodoAgent>) -> Self {
        let store = agent.store().clone();
        Self { agent, store }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    let todo_routes = Router::new()
        .route("/todo", post(todo_handler))
        .route("/todos", get(list_handler));

    Router::new()
        .route("/health", get(health_handler))
        .merge(todo_routes.clone())
        .nest("/api/v1/todo", todo_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS for the configured frontend origins. Unparseable origins are skipped;
/// `*` allows any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    if allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}

/// Wire the default provider and the configured store into an agent.
pub async fn build_agent(
    config: &todoclaw_config::AppConfig,
) -> Result<TodoAgent, Box<dyn std::error::Error>> {
    // Local servers such as ollama take no key.
    if !config.has_api_key() && config.default_provider != "ollama" {
        return Err(ProviderError::NotConfigured(format!(
            "no API key for '{}'",
            config.default_provider
        ))
        .into());
    }

    let router = todoclaw_providers::build_from_config(config);
    let provider = router
        .default()
        .ok_or_else(|| ProviderError::NotConfigured(config.default_provider.clone()))?;
    let invoker = ProviderInvoker::new(provider, &config.default_model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);

    let store = todoclaw_store::build_from_config(&config.store).await?;
    Ok(TodoAgent::from_config(config, Arc::new(invoker), store))
}

/// Start the gateway HTTP server.
pub async fn start(config: todoclaw_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let agent = Arc::new(build_agent(&config).await?);
    let state = Arc::new(GatewayState::new(agent));

    let app = build_router(state, &config.gateway.allowed_origins);

    info!(addr = %addr, store = %config.store.backend, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Errors ---

/// An error response shaped as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.name().to_string(),
    })
}

#[derive(Deserialize)]
struct TodoRequest {
    user_input: String,
}

#[derive(Serialize)]
struct TodoResponse {
    message: String,
    success: bool,
}

async fn todo_handler(
    State(state): State<SharedState>,
    Json(payload): Json<TodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    if payload.user_input.trim().is_empty() {
        return Err(ApiError::bad_request("User input cannot be empty"));
    }

    info!(input_len = payload.user_input.len(), "Todo request received");

    let run = state.agent.run(&payload.user_input).await;
    info!(
        status = run.status.as_str(),
        iterations = run.iterations,
        "Todo request answered"
    );

    Ok(Json(TodoResponse {
        message: run.message,
        success: true,
    }))
}

#[derive(Serialize)]
struct TodoItem {
    id: i64,
    task: String,
}

#[derive(Serialize)]
struct TodoListResponse {
    todos: Vec<TodoItem>,
    count: usize,
}

async fn list_handler(State(state): State<SharedState>) -> Result<Json<TodoListResponse>, ApiError> {
    let todos = state.store.list().await.map_err(|e| {
        error!(error = %e, "Listing todos failed");
        ApiError::internal(e.to_string())
    })?;

    let todos: Vec<TodoItem> = todos
        .into_iter()
        .map(|t| TodoItem {
            id: t.id,
            task: t.task,
        })
        .collect();

    Ok(Json(TodoListResponse {
        count: todos.len(),
        todos,
    }))
}
