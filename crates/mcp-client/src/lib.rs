//! `bc-mcp-client`: MCP client for the Birdcall chat front-end.
//!
//! - [`StreamableHttpTransport`]: JSON-RPC over streamable HTTP with the
//!   `mcp-session-id` header.
//! - [`McpClient`]: `initialize` handshake, `tools/list`, `tools/call`.
//!
//! ```rust,ignore
//! let client = McpClient::connect(&config.client).await?;
//! for tool in client.list_tools().await? {
//!     println!("{}", tool.name);
//! }
//! let result = client.call_tool("multiply", json!({"a": 2, "b": 3})).await?;
//! client.close().await;
//! ```

pub mod client;
mod sse;
pub mod transport;

pub use client::{McpClient, McpError};
pub use transport::{McpTransport, StreamableHttpTransport, TransportError};
