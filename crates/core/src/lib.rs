//! # Subserver Core
//!
//! Domain types, collaborator traits, and error definitions shared by every
//! subserver crate. Nothing here talks to the network: the upstream main
//! server, the MCP tool endpoints and the embedding backend are all reached
//! through the traits defined in this crate, and implemented elsewhere.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping the upstream or the vector backend via configuration
//! - Testing the agent loop with scripted mock collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod cache;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod vector;

// Re-export key types at crate root for ergonomics
pub use cache::{Clock, SystemClock, TtlCell, TtlMap};
#[cfg(any(test, feature = "test-util"))]
pub use cache::ManualClock;
pub use error::{ProviderError, ToolError, VectorError};
pub use message::{Message, flatten_content, truncate_chars};
pub use provider::{ChatMessage, Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{ToolRecord, ToolSource};
pub use vector::{Embedder, ScoredDocument, StoredDocument, VectorStore};
