//! Wire types shared by the MCP tool server and client: JSON-RPC 2.0
//! envelopes and the MCP payloads carried inside them.

pub mod jsonrpc;
pub mod mcp;

pub use jsonrpc::*;
pub use mcp::*;
