//! OpenAI-compatible provider over the main server's `/api/v1` routes.
//!
//! Supports:
//! - Chat completions (non-streaming)
//! - Embeddings

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use subserver_core::error::ProviderError;
use subserver_core::provider::*;
use tracing::debug;

use crate::main_server::MainServerClient;

/// An OpenAI-compatible LLM provider backed by the main server.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    embeddings_url: Option<String>,
    api_key: Option<String>,
    client: Arc<MainServerClient>,
}

impl OpenAiCompatProvider {
    /// Provider for `{main}/api/v1`.
    pub fn new(client: Arc<MainServerClient>) -> Self {
        Self {
            name: "main-server".into(),
            base_url: client.url("/api/v1"),
            embeddings_url: None,
            api_key: None,
            client,
        }
    }

    /// Bearer key sent on every request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Use a separate OpenAI-compatible base URL for embeddings.
    pub fn with_embeddings_url(mut self, base_url: Option<String>) -> Self {
        self.embeddings_url = base_url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, url: &str, timeout: Option<std::time::Duration>) -> reqwest::RequestBuilder {
        let builder = self.client.request(Method::POST, url, timeout);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn chat_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::chat_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let value = self
            .client
            .send_json(self.post(&url, request.timeout).json(&body))
            .await?;

        let api_response: ApiResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or(request.model),
            usage: api_response.usage,
        })
    }

    async fn embed(
        &self,
        model: &str,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let base = self.embeddings_url.as_deref().unwrap_or(&self.base_url);
        let url = format!("{base}/embeddings");

        let body = serde_json::json!({
            "model": model,
            "input": texts,
            "encoding_format": "float",
        });

        debug!(provider = %self.name, model, count = texts.len(), "Sending embedding request");

        let value = self.client.send_json(self.post(&url, None).json(&body)).await?;
        let api_resp: EmbeddingApiResponse = serde_json::from_value(value).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse embedding response: {e}"))
        })?;

        let mut data = api_resp.data;
        data.sort_by_key(|d| d.index);
        if data.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedServer, http_response, request_body};
    use std::time::Duration;

    fn provider_for(server: &CannedServer) -> OpenAiCompatProvider {
        let client = MainServerClient::new(server.url(), Duration::from_secs(5)).unwrap();
        OpenAiCompatProvider::new(Arc::new(client)).with_api_key(Some("xrk-agt".into()))
    }

    #[test]
    fn base_url_points_at_v1() {
        let client = MainServerClient::new("http://127.0.0.1:1234", Duration::from_secs(5)).unwrap();
        let provider = OpenAiCompatProvider::new(Arc::new(client));
        assert_eq!(provider.base_url(), "http://127.0.0.1:1234/api/v1");
        assert_eq!(provider.name(), "main-server");
    }

    #[test]
    fn chat_body_includes_sampling_params() {
        let req = ProviderRequest::single_turn("gptgod", "hi").with_max_tokens(100);
        let body = OpenAiCompatProvider::chat_body(&req);
        assert_eq!(body["model"], "gptgod");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn complete_parses_first_choice() {
        let server = CannedServer::start(vec![http_response(
            200,
            r#"{"model":"gptgod","choices":[{"message":{"role":"assistant","content":"{\"type\":\"final\",\"final\":\"4\"}"}}],"usage":{"total_tokens":12}}"#,
        )])
        .await;
        let provider = provider_for(&server);

        let resp = provider
            .complete(ProviderRequest::single_turn("gptgod", "2+2?"))
            .await
            .unwrap();
        assert_eq!(resp.content, r#"{"type":"final","final":"4"}"#);
        assert_eq!(resp.usage.unwrap().total_tokens, 12);

        let requests = server.requests().await;
        assert!(requests[0].starts_with("POST /api/v1/chat/completions"));
        assert!(requests[0].to_lowercase().contains("authorization: bearer xrk-agt"));
        assert_eq!(request_body(&requests[0])["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn complete_without_choices_is_invalid() {
        let server = CannedServer::start(vec![http_response(200, r#"{"choices":[]}"#)]).await;
        let err = provider_for(&server)
            .complete(ProviderRequest::single_turn("m", "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn embed_orders_by_index() {
        let server = CannedServer::start(vec![http_response(
            200,
            r#"{"data":[{"embedding":[0.4,0.5],"index":1},{"embedding":[0.1,0.2],"index":0}],"model":"m"}"#,
        )])
        .await;
        let vectors = provider_for(&server)
            .embed("m", &["a".into(), "b".into()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.4, 0.5]]);

        let requests = server.requests().await;
        assert!(requests[0].starts_with("POST /api/v1/embeddings"));
        assert_eq!(request_body(&requests[0])["input"][1], "b");
    }

    #[tokio::test]
    async fn embed_count_mismatch_is_invalid() {
        let server = CannedServer::start(vec![http_response(200, r#"{"data":[]}"#)]).await;
        let err = provider_for(&server).embed("m", &["a".into()]).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
