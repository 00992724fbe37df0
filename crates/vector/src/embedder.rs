//! Embedder backed by an upstream provider's embeddings endpoint.

use async_trait::async_trait;
use std::sync::Arc;
use subserver_core::error::VectorError;
use subserver_core::provider::Provider;
use subserver_core::vector::Embedder;

/// Embeds text through `Provider::embed`.
pub struct UpstreamEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl UpstreamEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for UpstreamEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VectorError> {
        self.provider
            .embed(&self.model, texts)
            .await
            .map_err(|e| VectorError::EmbeddingFailed(e.to_string()))
    }
}
