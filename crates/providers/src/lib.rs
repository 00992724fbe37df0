//! Upstream collaborators for the subserver.
//!
//! Everything here talks to the main server over one pooled HTTP client:
//! the OpenAI-compatible `Provider`, the MCP `ToolSource` and the SSE relay
//! used by the streaming chat route.

pub mod main_server;
pub mod mcp;
pub mod openai_compat;
pub mod sse;

#[cfg(test)]
pub(crate) mod test_support;

pub use main_server::MainServerClient;
pub use mcp::McpToolSource;
pub use openai_compat::OpenAiCompatProvider;
