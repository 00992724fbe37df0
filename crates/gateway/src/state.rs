//! Shared application state.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use subserver_config::AppConfig;
use subserver_core::cache::SystemClock;
use subserver_core::error::ProviderError;
use subserver_core::provider::Provider;
use subserver_core::tool::ToolSource;
use subserver_providers::{MainServerClient, McpToolSource, OpenAiCompatProvider};
use subserver_vector::{EmbeddingModel, InMemoryVectorStore, ModelOptions, UpstreamEmbedder, VectorService};
use std::time::Duration;

/// Everything the handlers share. Built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub main_server: Arc<MainServerClient>,
    /// Model used by the agent loop and the embedder.
    pub provider: Arc<dyn Provider>,
    pub tools: Arc<dyn ToolSource>,
    pub vector: Arc<VectorService>,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: AppConfig,
        main_server: Arc<MainServerClient>,
        provider: Arc<dyn Provider>,
        tools: Arc<dyn ToolSource>,
        vector: Arc<VectorService>,
    ) -> Self {
        Self {
            config,
            main_server,
            provider,
            tools,
            vector,
            started_at: Utc::now(),
        }
    }

    /// Wire the main server client, provider, tool source and vector
    /// service from configuration. Shares one HTTP client between them.
    pub fn from_config(config: AppConfig) -> Result<Self, ProviderError> {
        let main_server = Arc::new(MainServerClient::from_config(&config.main_server)?);

        let provider: Arc<dyn Provider> = Arc::new(
            OpenAiCompatProvider::new(main_server.clone())
                .with_api_key(config.agent.api_key.clone())
                .with_embeddings_url(config.vector.api_url.clone()),
        );

        let tools: Arc<dyn ToolSource> = Arc::new(McpToolSource::with_clock(
            main_server.clone(),
            config.agent.tool_cache_ttl(),
            Arc::new(SystemClock),
        ));

        let embedder = Arc::new(UpstreamEmbedder::new(provider.clone(), config.vector.model.clone()));
        let model = Arc::new(EmbeddingModel::new(
            embedder,
            ModelOptions {
                load_retries: config.vector.load_retries,
                retry_cooldown: Duration::from_secs(config.vector.retry_cooldown_secs),
                cache_size: config.vector.cache_size,
                cache_ttl: Duration::from_secs(config.vector.cache_ttl_secs),
            },
        ));
        let vector = Arc::new(VectorService::new(model, Arc::new(InMemoryVectorStore::new())));

        Ok(Self::new(config, main_server, provider, tools, vector))
    }
}
