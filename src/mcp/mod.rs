//! Model Context Protocol server
//!
//! Exposes the tool registry to an MCP host over stdio.

pub mod server;
pub mod types;

pub use server::McpServer;
pub use types::{McpError, LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};

use crate::tools::ToolRegistry;

/// Serve `registry` on stdin/stdout until the host disconnects.
pub async fn serve_stdio(registry: ToolRegistry) -> Result<(), McpError> {
    McpServer::new(registry).serve_stdio().await
}
