//! Lazily loaded embedding model with an embedding cache.
//!
//! The model is "loaded" by embedding a probe text. Loading retries with
//! exponential backoff; a failed load is remembered so requests fail fast
//! until the cooldown passes.

use std::sync::Arc;
use std::time::Duration;
use subserver_core::cache::TtlMap;
use subserver_core::error::VectorError;
use subserver_core::vector::Embedder;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

const PROBE_TEXT: &str = "warmup";
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

enum LoadState {
    Unloaded,
    Ready { dimension: usize },
    Failed { at: Instant, reason: String },
}

/// Load parameters for [`EmbeddingModel`].
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub load_retries: u32,
    pub retry_cooldown: Duration,
    pub cache_size: usize,
    pub cache_ttl: Duration,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            load_retries: 3,
            retry_cooldown: Duration::from_secs(60),
            cache_size: 1024,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

pub struct EmbeddingModel {
    embedder: Arc<dyn Embedder>,
    options: ModelOptions,
    state: Mutex<LoadState>,
    cache: TtlMap<String, Vec<f32>>,
}

impl EmbeddingModel {
    pub fn new(embedder: Arc<dyn Embedder>, options: ModelOptions) -> Self {
        let cache = TtlMap::new(options.cache_size, options.cache_ttl);
        Self {
            embedder,
            options,
            state: Mutex::new(LoadState::Unloaded),
            cache,
        }
    }

    pub fn name(&self) -> &str {
        self.embedder.model()
    }

    /// Load the model if needed and return its embedding dimension.
    ///
    /// Concurrent callers wait for a single load attempt.
    pub async fn ensure_loaded(&self) -> Result<usize, VectorError> {
        let mut state = self.state.lock().await;
        match &*state {
            LoadState::Ready { dimension } => return Ok(*dimension),
            LoadState::Failed { at, reason } if at.elapsed() < self.options.retry_cooldown => {
                return Err(VectorError::ModelUnavailable(reason.clone()));
            }
            _ => {}
        }

        match self.probe().await {
            Ok(dimension) => {
                info!(model = self.name(), dimension, "Embedding model loaded");
                *state = LoadState::Ready { dimension };
                Ok(dimension)
            }
            Err(reason) => {
                warn!(model = self.name(), %reason, "Embedding model unavailable");
                *state = LoadState::Failed {
                    at: Instant::now(),
                    reason: reason.clone(),
                };
                Err(VectorError::ModelUnavailable(reason))
            }
        }
    }

    async fn probe(&self) -> Result<usize, String> {
        let attempts = self.options.load_retries.max(1);
        let mut backoff = INITIAL_BACKOFF;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.embedder.embed(&[PROBE_TEXT.to_string()]).await {
                Ok(vectors) => match vectors.first() {
                    Some(v) if !v.is_empty() => return Ok(v.len()),
                    _ => last_error = "probe returned no embedding".into(),
                },
                Err(e) => last_error = e.to_string(),
            }
            warn!(model = self.name(), attempt, attempts, error = %last_error, "Embedding model load attempt failed");
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        Err(last_error)
    }

    pub async fn is_available(&self) -> bool {
        self.ensure_loaded().await.is_ok()
    }

    /// Embed `texts`, serving repeats from the cache.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VectorError> {
        self.ensure_loaded().await?;

        let mut results: Vec<Option<Vec<f32>>> = texts.iter().map(|t| self.cache.get(t)).collect();
        let missing: Vec<String> = texts
            .iter()
            .zip(&results)
            .filter(|(_, cached)| cached.is_none())
            .map(|(t, _)| t.clone())
            .collect();

        if !missing.is_empty() {
            let fresh = self.embedder.embed(&missing).await?;
            if fresh.len() != missing.len() {
                return Err(VectorError::EmbeddingFailed(format!(
                    "expected {} embeddings, got {}",
                    missing.len(),
                    fresh.len()
                )));
            }
            let mut fresh = fresh.into_iter();
            for (slot, text) in results.iter_mut().zip(texts) {
                if slot.is_none() {
                    let vector = fresh.next().unwrap_or_default();
                    self.cache.insert(text.clone(), vector.clone());
                    *slot = Some(vector);
                }
            }
        }

        Ok(results.into_iter().map(Option::unwrap_or_default).collect())
    }
}
