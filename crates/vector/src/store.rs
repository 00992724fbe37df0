//! In-memory vector store with cosine ranking.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use subserver_core::error::VectorError;
use subserver_core::vector::{ScoredDocument, StoredDocument, VectorStore};
use tokio::sync::RwLock;
use tracing::debug;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ, either vector is empty, or either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Relevance score for a hit: `max(0, 1 - cosine_distance)`, rounded to 4 places.
pub fn relevance_score(similarity: f32) -> f32 {
    let distance = 1.0 - similarity;
    let score = (1.0 - distance).max(0.0);
    (score * 10_000.0).round() / 10_000.0
}

/// Named collections of documents, upserted by id, held in memory.
///
/// Each collection keeps insertion order; all embeddings in a collection
/// share one dimension.
#[derive(Clone, Default)]
pub struct InMemoryVectorStore {
    collections: Arc<RwLock<HashMap<String, Vec<StoredDocument>>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn dimension_of(docs: &[StoredDocument]) -> Option<usize> {
    docs.first().map(|d| d.embedding.len())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(&self, collection: &str, documents: Vec<StoredDocument>) -> Result<usize, VectorError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let expected = dimension_of(docs).or_else(|| documents.first().map(|d| d.embedding.len()));
        if let Some(expected) = expected {
            if let Some(bad) = documents.iter().find(|d| d.embedding.len() != expected) {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.len(),
                });
            }
        }

        let written = documents.len();
        for doc in documents {
            match docs.iter_mut().find(|d| d.id == doc.id) {
                Some(existing) => *existing = doc,
                None => docs.push(doc),
            }
        }
        debug!(collection, written, total = docs.len(), "Upserted documents");
        Ok(written)
    }

    async fn query(&self, collection: &str, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredDocument>, VectorError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        if let Some(expected) = dimension_of(docs) {
            if expected != embedding.len() {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &StoredDocument)> = docs
            .iter()
            .map(|doc| (cosine_similarity(&doc.embedding, embedding), doc))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(sim, doc)| ScoredDocument {
                id: doc.id.clone(),
                text: doc.text.clone(),
                score: relevance_score(sim),
                metadata: doc.metadata.clone(),
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize, VectorError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0))
    }
}
