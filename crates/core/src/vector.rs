//! Embedding and vector store traits.
//!
//! The vector subsystem turns text into embeddings through an `Embedder` and
//! ranks stored documents against a query through a `VectorStore`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::VectorError;

/// A document held by a vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Unique ID within its collection
    pub id: String,

    /// The original text
    pub text: String,

    /// Arbitrary caller metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Embedding vector
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// A query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: String,
    pub text: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Turns text into embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The embedding model name (e.g., "paraphrase-multilingual-MiniLM-L12-v2").
    fn model(&self) -> &str;

    /// Embed each text; the result has one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, VectorError>;
}

/// The core VectorStore trait.
///
/// Implementations: in-memory. Persistence formats are out of scope.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Insert or replace documents by id. Returns how many were written.
    async fn upsert(
        &self,
        collection: &str,
        documents: Vec<StoredDocument>,
    ) -> std::result::Result<usize, VectorError>;

    /// The `top_k` documents closest to `embedding`, best first.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> std::result::Result<Vec<ScoredDocument>, VectorError>;

    /// Number of documents in a collection (0 when it does not exist).
    async fn count(&self, collection: &str) -> std::result::Result<usize, VectorError>;
}
