//! Embeddings and vector search for the subserver.
//!
//! Text is embedded through an upstream OpenAI-compatible endpoint and
//! ranked in an in-memory store by cosine similarity.

pub mod embedder;
pub mod model;
pub mod service;
pub mod store;

pub use embedder::UpstreamEmbedder;
pub use model::{EmbeddingModel, ModelOptions};
pub use service::{DocumentInput, EmbeddingItem, SearchOutcome, UpsertOutcome, VectorService};
pub use store::{InMemoryVectorStore, cosine_similarity};
