//! MCP client: handshake, tool discovery and tool calls over one transport.

use std::time::Duration;

use serde_json::Value;

use bc_domain::config::ClientConfig;
use bc_domain::tool::ToolDescriptor;
use bc_protocol::{
    methods, CallToolParams, InitializeParams, InitializeResult, JsonRpcError, ToolCallResult,
    ToolsListResult,
};

use crate::transport::{McpTransport, StreamableHttpTransport, TransportError};

/// Errors from talking to an MCP server.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a JSON-RPC error object.
    #[error("{0}")]
    Rpc(JsonRpcError),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// Session establishment failed; the client cannot continue.
    #[error("failed to connect to MCP server at {url}: {reason}")]
    Connection { url: String, reason: String },
}

impl From<McpError> for bc_domain::error::Error {
    fn from(e: McpError) -> Self {
        bc_domain::error::Error::Other(e.to_string())
    }
}

/// A connected MCP session.
pub struct McpClient {
    transport: Box<dyn McpTransport>,
    server_info: InitializeResult,
}

impl McpClient {
    /// Connect over streamable HTTP using the `[client]` config.
    pub async fn connect(cfg: &ClientConfig) -> Result<Self, McpError> {
        let connection_error = |reason: String| McpError::Connection {
            url: cfg.server_url.clone(),
            reason,
        };
        let transport = StreamableHttpTransport::new(
            cfg.server_url.clone(),
            Duration::from_millis(cfg.request_timeout_ms),
        )
        .map_err(|e| connection_error(e.to_string()))?;

        Self::initialize(Box::new(transport), &cfg.client_name)
            .await
            .map_err(|e| match e {
                McpError::Connection { .. } => e,
                other => connection_error(other.to_string()),
            })
    }

    /// Run the `initialize` handshake over an existing transport.
    pub async fn initialize(
        transport: Box<dyn McpTransport>,
        client_name: &str,
    ) -> Result<Self, McpError> {
        let params = serde_json::to_value(InitializeParams::new(client_name))
            .map_err(|e| McpError::Protocol(format!("failed to serialize initialize params: {e}")))?;

        let result = transport
            .send_request(methods::INITIALIZE, Some(params))
            .await?
            .into_result()
            .map_err(McpError::Rpc)?;
        let server_info: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("invalid initialize result: {e}")))?;

        transport
            .send_notification(methods::INITIALIZED, None)
            .await?;

        tracing::info!(
            server = %server_info.server_info.name,
            version = %server_info.server_info.version,
            protocol = %server_info.protocol_version,
            "MCP session initialized"
        );

        Ok(Self {
            transport,
            server_info,
        })
    }

    pub fn server_info(&self) -> &InitializeResult {
        &self.server_info
    }

    pub fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        self.transport
            .send_request(method, params)
            .await?
            .into_result()
            .map_err(McpError::Rpc)
    }

    /// Fetch the server's tool descriptors.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let result = self.request(methods::TOOLS_LIST, None).await?;
        let list: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("failed to parse tools/list result: {e}")))?;
        tracing::debug!(count = list.tools.len(), "tools listed");
        Ok(list.tools)
    }

    /// Invoke a tool. A result with `isError: true` is returned as-is.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, McpError> {
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(|e| McpError::Protocol(e.to_string()))?;

        let result = self.request(methods::TOOLS_CALL, Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("failed to parse tools/call result: {e}")))
    }

    pub async fn ping(&self) -> Result<(), McpError> {
        self.request(methods::PING, None).await.map(|_| ())
    }

    /// Terminate the server session. Safe to call more than once.
    pub async fn close(&self) {
        self.transport.shutdown().await;
    }
}
