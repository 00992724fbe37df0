//! Stubs and helpers for router tests.

use async_trait::async_trait;
use axum::Router;
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subserver_config::AppConfig;
use subserver_core::error::{ProviderError, ToolError, VectorError};
use subserver_core::provider::{Provider, ProviderRequest, ProviderResponse};
use subserver_core::tool::{ToolRecord, ToolSource};
use subserver_core::vector::Embedder;
use subserver_providers::MainServerClient;
use subserver_vector::{EmbeddingModel, InMemoryVectorStore, ModelOptions, VectorService};

use crate::state::{AppState, SharedState};

/// Answers with queued replies, then fails.
pub struct StubProvider {
    replies: Mutex<VecDeque<String>>,
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let next = self.replies.lock().unwrap().pop_front();
        next.map(|content| ProviderResponse {
            content,
            model: request.model,
            usage: None,
        })
        .ok_or_else(|| ProviderError::InvalidResponse("no scripted reply left".into()))
    }
}

/// Fixed listing; every call succeeds and is recorded.
pub struct StubTools {
    names: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl StubTools {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolSource for StubTools {
    async fn list_tools(&self) -> Result<Vec<ToolRecord>, ToolError> {
        Ok(self.names.iter().map(|n| ToolRecord::new(*n, "stub tool")).collect())
    }

    async fn invoke_tool(&self, name: &str, _arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        self.calls.lock().unwrap().push(name.to_string());
        Ok(json!({"success": true, "data": 4}))
    }
}

/// `[1, 0]` for texts mentioning "cat", `[0, 1]` otherwise.
pub struct StubEmbedder {
    down: bool,
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model(&self) -> &str {
        "stub-embedder"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VectorError> {
        if self.down {
            return Err(VectorError::EmbeddingFailed("embedder offline".into()));
        }
        Ok(texts
            .iter()
            .map(|t| if t.contains("cat") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
            .collect())
    }
}

pub struct TestDeps {
    pub config: AppConfig,
    pub replies: Vec<String>,
    pub tools: Vec<&'static str>,
    pub main_url: String,
    pub embedder_down: bool,
}

impl Default for TestDeps {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            replies: Vec::new(),
            tools: Vec::new(),
            main_url: "http://127.0.0.1:9".into(),
            embedder_down: false,
        }
    }
}

impl TestDeps {
    pub fn tool_source(&self) -> Arc<StubTools> {
        Arc::new(StubTools {
            names: self.tools.clone(),
            calls: Mutex::new(Vec::new()),
        })
    }
}

pub fn test_state(deps: TestDeps) -> SharedState {
    let tools = deps.tool_source();
    test_state_with_tools(deps, tools)
}

pub fn test_state_with_tools(deps: TestDeps, tools: Arc<StubTools>) -> SharedState {
    let main_server = Arc::new(MainServerClient::new(deps.main_url, Duration::from_secs(5)).unwrap());
    let provider = Arc::new(StubProvider {
        replies: Mutex::new(deps.replies.into()),
    });
    let model = Arc::new(EmbeddingModel::new(
        Arc::new(StubEmbedder {
            down: deps.embedder_down,
        }),
        ModelOptions {
            load_retries: 1,
            ..ModelOptions::default()
        },
    ));
    let vector = Arc::new(VectorService::new(model, Arc::new(InMemoryVectorStore::new())));
    Arc::new(AppState::new(deps.config, main_server, provider, tools, vector))
}

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A local URL nothing is listening on.
pub async fn unused_local_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub async fn read_body(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}
