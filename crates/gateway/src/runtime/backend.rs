//! The orchestration loop's view of the tool server.

use serde_json::Value;

use bc_domain::error::Result;
use bc_domain::tool::ToolDescriptor;
use bc_mcp_client::McpClient;
use bc_protocol::ToolCallResult;

/// Where tool calls requested by the model are executed.
#[async_trait::async_trait]
pub trait ToolBackend: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// A result flagged `is_error` is still `Ok`; `Err` means the call
    /// itself failed (transport, protocol, or a rejected request).
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult>;
}

#[async_trait::async_trait]
impl ToolBackend for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(McpClient::list_tools(self).await?)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        Ok(McpClient::call_tool(self, name, arguments).await?)
    }
}
