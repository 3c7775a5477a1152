//! JSON-RPC method dispatch for one MCP session.

use serde_json::{json, Value};

use bc_protocol::{
    methods, CallToolParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ToolCallResult, ToolsListResult,
};
use bc_sessions::Session;
use bc_tools::{ToolContext, ToolError};

use crate::state::AppState;

/// Server name reported in the `initialize` result.
pub const SERVER_NAME: &str = "birdcall";

/// Answer one request. Never fails; errors become JSON-RPC error objects.
pub async fn dispatch(state: &AppState, session: &Session, req: JsonRpcRequest) -> JsonRpcResponse {
    let id = req.id.clone();
    let outcome = match req.method.as_str() {
        methods::INITIALIZE => initialize(),
        methods::PING => Ok(json!({})),
        methods::TOOLS_LIST => tools_list(state),
        methods::TOOLS_CALL => tools_call(state, session, req.params).await,
        other => {
            tracing::debug!(session_id = %session.id(), method = %other, "unknown method");
            Err(JsonRpcError::method_not_found(other))
        }
    };

    match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(Some(id), error),
    }
}

fn to_result<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

fn initialize() -> Result<Value, JsonRpcError> {
    to_result(InitializeResult::for_server(
        SERVER_NAME,
        env!("CARGO_PKG_VERSION"),
    ))
}

fn tools_list(state: &AppState) -> Result<Value, JsonRpcError> {
    to_result(ToolsListResult {
        tools: state.tools.list().to_vec(),
    })
}

/// `tools/call`: rejections (unknown tool, invalid arguments, past
/// schedule times) are `-32602`; a failed execution is a result with
/// `isError: true` carrying the tool's message.
async fn tools_call(
    state: &AppState,
    session: &Session,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let params: CallToolParams = params
        .ok_or_else(|| JsonRpcError::invalid_params("missing params"))
        .and_then(|p| {
            serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
        })?;

    let ctx = ToolContext {
        session_id: Some(session.id().to_string()),
    };

    tracing::debug!(session_id = %session.id(), tool = %params.name, "tools/call");
    let result = match state.tools.invoke(&params.name, params.arguments, &ctx).await {
        Ok(result) => result,
        Err(ToolError::Execution(message)) => ToolCallResult::error(message),
        Err(e) if e.is_rejection() => {
            return Err(JsonRpcError::invalid_params(e.to_string()).with_data(rejection_data(&e)))
        }
        Err(e) => return Err(JsonRpcError::internal(e.to_string())),
    };
    to_result(result)
}

fn rejection_data(e: &ToolError) -> Value {
    match e {
        ToolError::NotFound(name) => json!({ "kind": "tool_not_found", "tool": name }),
        ToolError::SchemaValidation { field, message } => {
            json!({ "kind": "schema_validation", "field": field, "message": message })
        }
        ToolError::ScheduleInThePast { index, at } => {
            json!({ "kind": "schedule_in_the_past", "index": index, "scheduleTime": at })
        }
        _ => Value::Null,
    }
}
