use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A remote procedure exposed by the tool server.
///
/// Serializes in MCP wire form (`inputSchema`), so the same type is used
/// for `tools/list` on both sides of the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the tool's arguments.
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

/// Function declaration in the shape the LLM accepts.
/// Produced from a [`ToolDescriptor`] by the schema adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A function call requested by the model (provider-agnostic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: Value,
}

pub fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation turns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One entry of the conversation log, replayed to the LLM in order.
///
/// A `ModelToolCall` is always followed by exactly one `ToolResult`
/// before the next `User` turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },
    ModelText {
        text: String,
    },
    ModelToolCall {
        tool_name: String,
        arguments: Value,
    },
    ToolResult {
        tool_name: String,
        text: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::ModelText { text: text.into() }
    }

    pub fn tool_call(call: &ToolCall) -> Self {
        Self::ModelToolCall {
            tool_name: call.tool_name.clone(),
            arguments: call.arguments.clone(),
        }
    }

    pub fn tool_result(tool_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_name: tool_name.into(),
            text: text.into(),
            is_error: false,
        }
    }

    pub fn tool_error(tool_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_name: tool_name.into(),
            text: text.into(),
            is_error: true,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}
