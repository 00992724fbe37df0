//! Embed, search and upsert operations behind the vector routes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use subserver_core::error::VectorError;
use subserver_core::vector::{ScoredDocument, StoredDocument, VectorStore};
use tracing::{debug, warn};

use crate::model::EmbeddingModel;

pub const DEFAULT_COLLECTION: &str = "default";
pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 100;

/// One embedded text.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingItem {
    pub text: String,
    pub embedding: Vec<f32>,
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub success: bool,
    pub results: Vec<ScoredDocument>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome {
    pub success: bool,
    pub collection: String,
    pub inserted: usize,
}

/// A document to upsert: either bare text or `{id?, text, metadata?}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentInput {
    Text(String),
    Full {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        text: String,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
}

impl DocumentInput {
    fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Full { text, .. } => text,
        }
    }
}

/// Clamp a requested `top_k`: absent or zero means the default, at most `MAX_TOP_K`.
pub fn clamp_top_k(top_k: Option<usize>) -> usize {
    match top_k {
        Some(k) if k > 0 => k.min(MAX_TOP_K),
        _ => DEFAULT_TOP_K,
    }
}

pub struct VectorService {
    model: Arc<EmbeddingModel>,
    store: Arc<dyn VectorStore>,
}

impl VectorService {
    pub fn new(model: Arc<EmbeddingModel>, store: Arc<dyn VectorStore>) -> Self {
        Self { model, store }
    }

    pub fn model(&self) -> &EmbeddingModel {
        &self.model
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<EmbeddingItem>, VectorError> {
        if texts.is_empty() {
            return Err(VectorError::InvalidInput("texts must be a non-empty list".into()));
        }
        let embeddings = self.model.embed(&texts).await?;
        Ok(texts
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| EmbeddingItem {
                dimension: embedding.len(),
                text,
                embedding,
            })
            .collect())
    }

    /// Rank a collection against `query`.
    ///
    /// An unavailable embedding model yields an empty successful result.
    pub async fn search(&self, query: &str, collection: &str, top_k: Option<usize>) -> Result<SearchOutcome, VectorError> {
        if query.trim().is_empty() {
            return Err(VectorError::InvalidInput("query must be a non-empty string".into()));
        }

        if !self.model.is_available().await {
            warn!(collection, "Vector backend unavailable, returning empty results");
            return Ok(SearchOutcome {
                success: true,
                results: Vec::new(),
                count: 0,
                message: Some("Vector search backend unavailable".into()),
            });
        }

        let top_k = clamp_top_k(top_k);
        let embedding = self
            .model
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        let results = self.store.query(collection, &embedding, top_k).await?;
        debug!(collection, top_k, hits = results.len(), "Vector search");

        Ok(SearchOutcome {
            success: true,
            count: results.len(),
            results,
            message: None,
        })
    }

    /// Embed and store documents. Missing ids become `doc_<index>`.
    pub async fn upsert(&self, collection: &str, documents: Vec<DocumentInput>) -> Result<UpsertOutcome, VectorError> {
        if documents.is_empty() {
            return Err(VectorError::InvalidInput("documents must be a non-empty list".into()));
        }

        self.model.ensure_loaded().await?;

        if documents.iter().any(|d| d.text().is_empty()) {
            return Err(VectorError::InvalidInput("document text must not be empty".into()));
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text().to_string()).collect();
        let embeddings = self.model.embed(&texts).await?;

        let stored: Vec<StoredDocument> = documents
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (doc, embedding))| {
                let (id, text, metadata) = match doc {
                    DocumentInput::Text(text) => (None, text, Map::new()),
                    DocumentInput::Full { id, text, metadata } => (id, text, metadata),
                };
                StoredDocument {
                    id: id.unwrap_or_else(|| format!("doc_{i}")),
                    text,
                    metadata,
                    embedding,
                }
            })
            .collect();

        let inserted = self.store.upsert(collection, stored).await?;
        Ok(UpsertOutcome {
            success: true,
            collection: collection.to_string(),
            inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelOptions;
    use crate::store::InMemoryVectorStore;
    use async_trait::async_trait;
    use serde_json::json;
    use subserver_core::vector::Embedder;

    /// Maps a handful of words onto fixed axes.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn model(&self) -> &str {
            "axis"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VectorError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        if t.contains("rust") { 1.0 } else { 0.0 },
                        if t.contains("python") { 1.0 } else { 0.0 },
                        0.1,
                    ]
                })
                .collect())
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn model(&self) -> &str {
            "down"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, VectorError> {
            Err(VectorError::EmbeddingFailed("offline".into()))
        }
    }

    fn service(embedder: Arc<dyn Embedder>) -> VectorService {
        let options = ModelOptions {
            load_retries: 1,
            ..ModelOptions::default()
        };
        VectorService::new(
            Arc::new(EmbeddingModel::new(embedder, options)),
            Arc::new(InMemoryVectorStore::new()),
        )
    }

    #[test]
    fn top_k_clamping() {
        assert_eq!(clamp_top_k(None), 5);
        assert_eq!(clamp_top_k(Some(0)), 5);
        assert_eq!(clamp_top_k(Some(7)), 7);
        assert_eq!(clamp_top_k(Some(1000)), 100);
    }

    #[test]
    fn document_input_accepts_text_or_object() {
        let docs: Vec<DocumentInput> =
            serde_json::from_value(json!(["plain", {"id": "x", "text": "full", "metadata": {"k": 1}}])).unwrap();
        assert_eq!(docs[0].text(), "plain");
        assert_eq!(docs[1].text(), "full");
    }

    #[tokio::test]
    async fn upsert_then_search() {
        let svc = service(Arc::new(AxisEmbedder));
        let docs: Vec<DocumentInput> = serde_json::from_value(json!([
            {"id": "r", "text": "Rust ownership", "metadata": {"lang": "rust"}},
            "Python generators"
        ]))
        .unwrap();
        let outcome = svc.upsert("notes", docs).await.unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.collection, "notes");

        let found = svc.search("rust borrow checker", "notes", Some(1)).await.unwrap();
        assert!(found.success);
        assert_eq!(found.count, 1);
        assert_eq!(found.results[0].id, "r");
        assert_eq!(found.results[0].metadata["lang"], "rust");

        let all = svc.search("python", "notes", None).await.unwrap();
        assert_eq!(all.results[0].id, "doc_1");
    }

    #[tokio::test]
    async fn embed_reports_dimension() {
        let svc = service(Arc::new(AxisEmbedder));
        let items = svc.embed(vec!["rust".into()]).await.unwrap();
        assert_eq!(items[0].dimension, 3);
        assert_eq!(items[0].text, "rust");
    }

    #[tokio::test]
    async fn empty_inputs_rejected() {
        let svc = service(Arc::new(AxisEmbedder));
        assert!(matches!(svc.embed(vec![]).await, Err(VectorError::InvalidInput(_))));
        assert!(matches!(svc.search("  ", "c", None).await, Err(VectorError::InvalidInput(_))));
        assert!(matches!(svc.upsert("c", vec![]).await, Err(VectorError::InvalidInput(_))));
        let blank = vec![DocumentInput::Text(String::new())];
        assert!(matches!(svc.upsert("c", blank).await, Err(VectorError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn unavailable_model_degrades() {
        let svc = service(Arc::new(DownEmbedder));
        let found = svc.search("anything", "c", None).await.unwrap();
        assert!(found.success);
        assert!(found.results.is_empty());
        assert!(found.message.is_some());

        let err = svc.upsert("c", vec![DocumentInput::Text("x".into())]).await.unwrap_err();
        assert!(matches!(err, VectorError::ModelUnavailable(_)));
        assert!(matches!(svc.embed(vec!["x".into()]).await, Err(VectorError::ModelUnavailable(_))));
    }
}
