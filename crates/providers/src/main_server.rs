//! Pooled HTTP client for the upstream main server.
//!
//! One `reqwest::Client` is shared by every collaborator that talks to the
//! main server: the chat provider, the MCP tool source and the chat proxy
//! routes. Keep-alive connections are reused across requests.

use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use subserver_config::MainServerConfig;
use subserver_core::error::ProviderError;
use subserver_core::truncate_chars;
use tracing::{debug, warn};

/// Maximum idle keep-alive connections per upstream host.
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// How much of an upstream error body is kept in error messages.
const ERROR_BODY_CHARS: usize = 500;

/// Client for the main server's HTTP API.
#[derive(Debug, Clone)]
pub struct MainServerClient {
    base_url: String,
    default_timeout: Duration,
    client: reqwest::Client,
}

impl MainServerClient {
    /// Build a client from the `[main_server]` config section.
    pub fn from_config(config: &MainServerConfig) -> Result<Self, ProviderError> {
        Self::new(config.url(), config.timeout())
    }

    pub fn new(base_url: impl Into<String>, default_timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Absolute URL for an API path such as `/api/v3/models`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request against an absolute URL using the shared pool.
    pub fn request(&self, method: Method, url: &str, timeout: Option<Duration>) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(timeout.unwrap_or(self.default_timeout))
    }

    /// Send a request; non-2xx statuses become `ProviderError::ApiError`.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %truncate_chars(&body, 200), "Main server returned error");
        Err(ProviderError::ApiError {
            status_code: status.as_u16(),
            message: truncate_chars(&body, ERROR_BODY_CHARS).to_string(),
        })
    }

    /// Send a request and decode the JSON body.
    pub async fn send_json(&self, builder: RequestBuilder) -> Result<Value, ProviderError> {
        let response = self.send(builder).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))
    }

    /// Call a main server API path and return its JSON response.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, ProviderError> {
        debug!(%method, path, "Calling main server");
        let mut builder = self.request(method, &self.url(path), timeout);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send_json(builder).await
    }

    /// POST a JSON body and return the raw response for streaming relay.
    pub async fn stream_post(
        &self,
        path: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<Response, ProviderError> {
        debug!(path, "Opening streaming request to main server");
        let builder = self
            .request(Method::POST, &self.url(path), timeout)
            .header("Accept", "text/event-stream")
            .json(body);
        self.send(builder).await
    }
}

/// Classify a transport failure.
pub(crate) fn map_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else if e.is_connect() {
        ProviderError::Connect(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}
