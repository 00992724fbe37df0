//! `langchain-service` group: chat (agent or proxy), model listing and MCP tools.
//!
//! - `POST /api/langchain/chat`: Chat; agent with tools, proxy, or SSE relay
//! - `GET  /api/langchain/models`: Models offered by the main server
//! - `GET  /api/langchain/tools`: MCP tool listing
//! - `POST /api/langchain/tools/call`: Invoke one MCP tool

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Method, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use subserver_agent::{RunConfig, RunConfigError};
use subserver_core::message::Message;
use subserver_providers::sse;
use tracing::{info, warn};

use crate::error::{ApiError, bad_request, provider_error};
use crate::groups::ApiGroup;
use crate::state::{AppState, SharedState};

const CHAT_COMPLETIONS_PATH: &str = "/api/v3/chat/completions";
const MODELS_PATH: &str = "/api/v3/models";
const PROXY_TIMEOUT: Duration = Duration::from_secs(60);
const MODELS_TIMEOUT: Duration = Duration::from_secs(30);

pub fn group() -> ApiGroup {
    ApiGroup {
        name: "langchain-service",
        description: "Chat with MCP tool use through the main server",
        priority: 90,
        routes: &[
            ("POST", "/api/langchain/chat"),
            ("GET", "/api/langchain/models"),
            ("GET", "/api/langchain/tools"),
            ("POST", "/api/langchain/tools/call"),
        ],
        router,
    }
}

fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/langchain/chat", post(chat_handler))
        .route("/api/langchain/models", get(models_handler))
        .route("/api/langchain/tools", get(tools_handler))
        .route("/api/langchain/tools/call", post(tool_call_handler))
}

// ── Request types ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Value,
    /// Model or provider identifier, e.g. `gptgod` or `volcengine`.
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    stream: bool,
    #[serde(default = "default_true")]
    use_tools: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ToolCallRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Value,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if !payload.messages.as_array().is_some_and(|m| !m.is_empty()) {
        return Err(bad_request("messages must be a non-empty list"));
    }
    let conversation: Vec<Message> = serde_json::from_value(payload.messages.clone())
        .map_err(|e| bad_request(format!("messages must be a list of message objects: {e}")))?;

    let defaults = &state.config.agent;
    let model = payload
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| defaults.default_model.clone());
    let temperature = payload.temperature.unwrap_or(defaults.default_temperature);
    let max_tokens = payload.max_tokens.unwrap_or(defaults.default_max_tokens);

    info!(
        model = %model,
        messages = conversation.len(),
        stream = payload.stream,
        use_tools = payload.use_tools,
        "Chat request"
    );

    let mut upstream = json!({
        "messages": payload.messages,
        "model": model,
        "temperature": temperature,
        "max_tokens": max_tokens,
        "stream": payload.stream,
    });
    if let Some(key) = state.config.main_server.api_key.as_deref().filter(|k| !k.is_empty()) {
        upstream["apiKey"] = json!(key);
    }

    if payload.stream {
        let response = state
            .main_server
            .stream_post(CHAT_COMPLETIONS_PATH, &upstream, None)
            .await
            .map_err(|e| provider_error(&e, state.main_server.base_url()))?;
        let body = Body::from_stream(sse::relay(response));
        return Ok((
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response());
    }

    if payload.use_tools && defaults.enabled {
        match agent_config(&state, &model, temperature, max_tokens) {
            Ok(run_config) => {
                let answer = subserver_agent::run(&conversation, &run_config).await;
                return Ok(Json(json!({
                    "choices": [{"message": {"content": answer}}],
                    "usage": {"total_tokens": 0},
                    "model": model,
                }))
                .into_response());
            }
            Err(e) => warn!(error = %e, "Agent unavailable for this request, falling back to direct chat"),
        }
    }

    let result = state
        .main_server
        .request_json(Method::POST, CHAT_COMPLETIONS_PATH, Some(&upstream), Some(PROXY_TIMEOUT))
        .await
        .map_err(|e| provider_error(&e, state.main_server.base_url()))?;
    Ok(Json(result).into_response())
}

fn agent_config(
    state: &AppState,
    model: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<RunConfig, RunConfigError> {
    let agent = &state.config.agent;
    RunConfig::builder(state.provider.clone(), state.tools.clone())
        .with_model(model)
        .with_temperature(temperature)
        .with_max_tokens(max_tokens)
        .with_max_steps(agent.max_steps)
        .with_max_tools(agent.max_tools)
        .with_verbose(agent.verbose)
        .with_timeout(agent.request_timeout())
        .build()
}

async fn models_handler(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    state
        .main_server
        .request_json(Method::GET, MODELS_PATH, None, Some(MODELS_TIMEOUT))
        .await
        .map(Json)
        .map_err(|e| provider_error(&e, state.main_server.base_url()))
}

async fn tools_handler(State(state): State<SharedState>) -> Json<Value> {
    let tools = match state.tools.list_tools().await {
        Ok(tools) => tools,
        Err(e) => {
            warn!(error = %e, "MCP tool listing unavailable");
            Vec::new()
        }
    };
    Json(json!({"tools": tools, "count": tools.len()}))
}

async fn tool_call_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ToolCallRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(bad_request("tool name must not be empty"));
    }
    let arguments = match payload.arguments {
        Value::Null => Map::new(),
        Value::Object(args) => args,
        _ => return Err(bad_request("arguments must be a JSON object")),
    };

    let result = match state.tools.invoke_tool(name, &arguments).await {
        Ok(result) => result,
        Err(e) => json!({"success": false, "error": e.to_string()}),
    };
    Ok(Json(result))
}
