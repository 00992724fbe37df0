//! Error types for the subserver domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; callers map them at their
//! own boundary.

use thiserror::Error;

/// Failures talking to the upstream main server (chat, models, embeddings).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Cannot connect to upstream: {0}")]
    Connect(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// The HTTP status a gateway should answer with when relaying this error.
    pub fn gateway_status(&self) -> u16 {
        match self {
            Self::ApiError { status_code, .. } => *status_code,
            Self::Timeout(_) => 504,
            Self::Connect(_) => 502,
            Self::Network(_) | Self::InvalidResponse(_) => 502,
            Self::NotConfigured(_) => 503,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool listing failed: {0}")]
    ListingFailed(String),

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum VectorError {
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
