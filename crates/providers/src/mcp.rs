//! MCP tool source backed by the main server.
//!
//! The main server aggregates MCP tools and exposes them under `/api/mcp`.
//! Listings are cached for a short time; invocations never fail at the
//! transport level, every error is folded into a `success=false` result.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use subserver_core::cache::{Clock, SystemClock, TtlCell};
use subserver_core::error::{ProviderError, ToolError};
use subserver_core::tool::{ToolRecord, ToolSource};
use subserver_core::truncate_chars;
use tracing::{error, info, warn};

use crate::main_server::MainServerClient;

const LIST_PATH: &str = "/api/mcp/tools";
const CALL_PATH: &str = "/api/mcp/tools/call";
const LIST_TIMEOUT: Duration = Duration::from_secs(30);
const CALL_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Lists and invokes the main server's MCP tools.
pub struct McpToolSource {
    client: Arc<MainServerClient>,
    cache: TtlCell<Vec<ToolRecord>>,
    call_timeout: Duration,
}

impl McpToolSource {
    pub fn new(client: Arc<MainServerClient>) -> Self {
        Self::with_clock(client, DEFAULT_CACHE_TTL, Arc::new(SystemClock))
    }

    pub fn with_clock(client: Arc<MainServerClient>, cache_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            cache: TtlCell::with_clock(cache_ttl, clock),
            call_timeout: CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn fetch(&self) -> Result<Vec<ToolRecord>, ProviderError> {
        let body = self
            .client
            .request_json(Method::GET, LIST_PATH, None, Some(LIST_TIMEOUT))
            .await?;
        Ok(parse_listing(&body))
    }
}

/// Extract tool records from `{success, tools: [...], count}`.
///
/// Entries that are not objects are skipped.
fn parse_listing(body: &Value) -> Vec<ToolRecord> {
    body.get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|t| serde_json::from_value::<ToolRecord>(t.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn failure(message: impl Into<String>) -> Value {
    json!({"success": false, "error": message.into()})
}

#[async_trait]
impl ToolSource for McpToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolRecord>, ToolError> {
        if let Some(tools) = self.cache.get_fresh() {
            return Ok(tools);
        }

        match self.fetch().await {
            Ok(tools) => {
                info!(count = tools.len(), "Fetched MCP tool listing");
                if !tools.is_empty() {
                    self.cache.put(tools.clone());
                }
                Ok(tools)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch MCP tool listing");
                self.cache
                    .get_stale()
                    .ok_or_else(|| ToolError::ListingFailed(e.to_string()))
            }
        }
    }

    async fn invoke_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let body = json!({"name": name, "arguments": arguments});
        let result = self
            .client
            .request_json(Method::POST, CALL_PATH, Some(&body), Some(self.call_timeout))
            .await;

        Ok(match result {
            Ok(value) => value,
            Err(ProviderError::Timeout(_)) => {
                error!(tool = name, "MCP tool call timed out");
                failure(format!("Tool call timed out: {name}"))
            }
            Err(ProviderError::Connect(_)) => {
                error!(tool = name, "Cannot connect to main server");
                failure("Cannot connect to main server")
            }
            Err(ProviderError::ApiError { status_code, message }) => {
                error!(tool = name, status_code, "MCP tool call failed");
                failure(format!("HTTP {status_code}: {}", truncate_chars(&message, 200)))
            }
            Err(e) => {
                error!(tool = name, error = %e, "MCP tool call failed");
                failure(format!("Tool call failed: {e}"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedServer, http_response, request_body};
    use subserver_core::cache::ManualClock;

    const LISTING: &str = r#"{"success":true,"tools":[{"name":"weather.now","description":"Weather","inputSchema":{"properties":{"city":{}}}},{"name":"calc.add"}],"count":2}"#;

    fn source_for(url: &str, clock: Arc<ManualClock>) -> McpToolSource {
        let client = MainServerClient::new(url, Duration::from_secs(5)).unwrap();
        McpToolSource::with_clock(Arc::new(client), Duration::from_secs(60), clock)
    }

    #[test]
    fn parse_listing_skips_non_objects() {
        let body = json!({"tools": [{"name": "a"}, 7, "b"]});
        let tools = parse_listing(&body);
        assert_eq!(tools.len(), 1);
        assert!(parse_listing(&json!({"success": true})).is_empty());
    }

    #[tokio::test]
    async fn listing_is_cached() {
        let server = CannedServer::start(vec![http_response(200, LISTING)]).await;
        let clock = Arc::new(ManualClock::new());
        let source = source_for(&server.url(), clock.clone());

        let first = source.list_tools().await.unwrap();
        assert_eq!(first.len(), 2);
        clock.advance(Duration::from_secs(30));
        let second = source.list_tools().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(server.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn stale_listing_served_when_refresh_fails() {
        let server = CannedServer::start(vec![http_response(200, LISTING), http_response(500, "boom")]).await;
        let clock = Arc::new(ManualClock::new());
        let source = source_for(&server.url(), clock.clone());

        assert_eq!(source.list_tools().await.unwrap().len(), 2);
        clock.advance(Duration::from_secs(61));
        let stale = source.list_tools().await.unwrap();
        assert_eq!(stale.len(), 2);
        assert_eq!(server.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn listing_failure_without_cache_is_error() {
        let source = source_for("http://127.0.0.1:1", Arc::new(ManualClock::new()));
        let err = source.list_tools().await.unwrap_err();
        assert!(matches!(err, ToolError::ListingFailed(_)));
    }

    #[tokio::test]
    async fn empty_listing_is_not_cached() {
        let server = CannedServer::start(vec![
            http_response(200, r#"{"tools":[]}"#),
            http_response(200, LISTING),
        ])
        .await;
        let source = source_for(&server.url(), Arc::new(ManualClock::new()));
        assert!(source.list_tools().await.unwrap().is_empty());
        assert_eq!(source.list_tools().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invoke_posts_name_and_arguments() {
        let server = CannedServer::start(vec![http_response(200, r#"{"success":true,"data":{"sum":3}}"#)]).await;
        let source = source_for(&server.url(), Arc::new(ManualClock::new()));

        let mut args = Map::new();
        args.insert("a".into(), json!(1));
        args.insert("b".into(), json!(2));
        let result = source.invoke_tool("calc.add", &args).await.unwrap();
        assert_eq!(result["data"]["sum"], 3);

        let requests = server.requests().await;
        assert!(requests[0].starts_with("POST /api/mcp/tools/call"));
        let body = request_body(&requests[0]);
        assert_eq!(body["name"], "calc.add");
        assert_eq!(body["arguments"]["b"], 2);
    }

    #[tokio::test]
    async fn invoke_folds_http_errors() {
        let server = CannedServer::start(vec![http_response(500, "tool exploded")]).await;
        let source = source_for(&server.url(), Arc::new(ManualClock::new()));
        let result = source.invoke_tool("calc.add", &Map::new()).await.unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "HTTP 500: tool exploded");
    }

    #[tokio::test]
    async fn invoke_folds_connect_errors() {
        let source = source_for("http://127.0.0.1:1", Arc::new(ManualClock::new()));
        let result = source.invoke_tool("calc.add", &Map::new()).await.unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "Cannot connect to main server");
    }
}
