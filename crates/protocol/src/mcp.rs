//! MCP payloads carried inside JSON-RPC envelopes.

use bc_domain::tool::ToolDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
/// Header carrying the session id on every request after `initialize`.
pub const SESSION_HEADER: &str = "mcp-session-id";

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const LOG_MESSAGE: &str = "notifications/message";
}

/// `true` if `raw` is a well-formed `initialize` request: a JSON-RPC 2.0
/// object with an id, the `initialize` method and an object `params`
/// naming a protocol version.
pub fn is_initialize_request(raw: &Value) -> bool {
    raw.get("jsonrpc").and_then(Value::as_str) == Some("2.0")
        && raw.get("id").is_some_and(|id| id.is_number() || id.is_string())
        && raw.get("method").and_then(Value::as_str) == Some(methods::INITIALIZE)
        && raw
            .get("params")
            .and_then(|p| p.get("protocolVersion"))
            .is_some_and(Value::is_string)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handshake
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Name and version of either peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub client_info: Implementation,
}

impl InitializeParams {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: serde_json::json!({}),
            client_info: Implementation {
                name: client_name.into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: Value,
    pub server_info: Implementation,
}

impl InitializeResult {
    /// The server's answer: tools and logging notifications supported.
    pub fn for_server(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: serde_json::json!({
                "tools": { "listChanged": false },
                "logging": {}
            }),
            server_info: Implementation {
                name: name.into(),
                version: version.into(),
            },
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tools
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The result payload from `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolDescriptor>,
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

/// A single content item in a `tools/call` result.
///
/// Only `text` items are produced by this server; other kinds received
/// from a foreign server keep their fields in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".into(),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }
}

/// The result payload from `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(default, rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: true,
        }
    }

    /// Flatten the payload to a single string: the text of the first
    /// content item if it has one, otherwise the whole content list as
    /// pretty-printed JSON.
    pub fn flatten_text(&self) -> String {
        match self.content.first().and_then(|c| c.text.as_deref()) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => serde_json::to_string_pretty(&self.content).unwrap_or_default(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server → client notifications
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Params of `notifications/message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessageParams {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: Value,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognizes_initialize_request() {
        let raw = json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {"protocolVersion": "2024-11-05", "capabilities": {},
                       "clientInfo": {"name": "t", "version": "1"}}
        });
        assert!(is_initialize_request(&raw));
    }

    #[test]
    fn initialize_without_params_is_not_initialize_request() {
        let raw = json!({"jsonrpc": "2.0", "id": 0, "method": "initialize"});
        assert!(!is_initialize_request(&raw));
    }

    #[test]
    fn initialize_notification_is_not_initialize_request() {
        let raw = json!({
            "jsonrpc": "2.0", "method": "initialize",
            "params": {"protocolVersion": "2024-11-05"}
        });
        assert!(!is_initialize_request(&raw));
    }

    #[test]
    fn call_params_default_to_empty_arguments() {
        let p: CallToolParams = serde_json::from_value(json!({"name": "currentTime"})).unwrap();
        assert_eq!(p.arguments, json!({}));
    }

    #[test]
    fn success_result_omits_is_error() {
        let v = serde_json::to_value(ToolCallResult::text("ok")).unwrap();
        assert_eq!(v, json!({"content": [{"type": "text", "text": "ok"}]}));
    }

    #[test]
    fn flatten_prefers_first_text() {
        let r: ToolCallResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "6"}, {"type": "text", "text": "ignored"}]
        }))
        .unwrap();
        assert_eq!(r.flatten_text(), "6");
    }

    #[test]
    fn flatten_falls_back_to_pretty_json() {
        let r: ToolCallResult = serde_json::from_value(json!({
            "content": [{"type": "image", "data": "AAAA", "mimeType": "image/png"}]
        }))
        .unwrap();
        let flat = r.flatten_text();
        assert!(flat.contains("\"mimeType\": \"image/png\""));
        assert!(flat.contains('\n'));
    }
}
