//! Shared test helpers: a scripted model and a recording tool source.

use serde_json::{Map, Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use subserver_core::error::{ProviderError, ToolError};
use subserver_core::provider::{Provider, ProviderRequest, ProviderResponse};
use subserver_core::tool::{ToolRecord, ToolSource};

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` pops the next result. Panics if more calls are
/// made than results provided.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call answers with one of `texts`, in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// The requests received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request);
            prompts.len()
        };
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no response for call #{call}"));
        next.map(|content| ProviderResponse {
            content,
            model,
            usage: None,
        })
    }
}

/// A tool source with a fixed listing that records every invocation.
pub struct RecordingToolSource {
    listing: Result<Vec<ToolRecord>, ToolError>,
    results: HashMap<String, Result<Value, ToolError>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingToolSource {
    pub fn with_tools(tools: Vec<ToolRecord>) -> Self {
        Self {
            listing: Ok(tools),
            results: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A source whose listing always fails.
    pub fn failing_listing() -> Self {
        Self {
            listing: Err(ToolError::ListingFailed("main server down".into())),
            results: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Tools named `names`, each with an empty description.
    pub fn named(names: &[&str]) -> Self {
        Self::with_tools(names.iter().map(|n| ToolRecord::new(*n, "")).collect())
    }

    /// Result returned when `name` is invoked. Unset tools answer `{"success":true}`.
    pub fn with_result(mut self, name: &str, result: Result<Value, ToolError>) -> Self {
        self.results.insert(name.to_string(), result);
        self
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ToolSource for RecordingToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolRecord>, ToolError> {
        self.listing.clone()
    }

    async fn invoke_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        self.results
            .get(name)
            .cloned()
            .unwrap_or_else(|| Ok(json!({"success": true})))
    }
}
