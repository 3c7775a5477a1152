//! Drives `McpClient` against a scripted in-process HTTP server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use bc_domain::config::ClientConfig;
use bc_mcp_client::{McpClient, McpError};

const SESSION: &str = "test-session-1";

#[derive(Default)]
struct Script {
    deleted: AtomicBool,
}

async fn handle_post(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let id = body.get("id").cloned().unwrap_or(Value::Null);
    let session = headers.get("mcp-session-id").and_then(|v| v.to_str().ok());

    if method == "initialize" {
        let result = json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "scripted", "version": "0.0.1"}
            }
        });
        return ([("mcp-session-id", SESSION)], Json(result)).into_response();
    }

    if session != Some(SESSION) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "jsonrpc": "2.0",
                "error": {"code": -32000, "message": "Bad Request: No valid session ID provided"},
                "id": null
            })),
        )
            .into_response();
    }

    match method.as_str() {
        "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
        "tools/list" => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {"tools": [
                {"name": "multiply", "description": "multiply two numbers",
                 "inputSchema": {"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}},
                {"name": "currentTime"}
            ]}
        }))
        .into_response(),
        // Reply as an event stream, with a notification ahead of the answer.
        "tools/call" => {
            let note = json!({"jsonrpc": "2.0", "method": "notifications/message",
                              "params": {"level": "info", "data": "working"}});
            let answer = json!({"jsonrpc": "2.0", "id": id,
                                "result": {"content": [{"type": "text", "text": "2 multiplied by 3 is 6"}]}});
            let body = format!("event: message\ndata: {note}\n\nevent: message\ndata: {answer}\n\n");
            ([("content-type", "text/event-stream")], body).into_response()
        }
        other => Json(json!({
            "jsonrpc": "2.0", "id": id,
            "error": {"code": -32601, "message": format!("Method not found: {other}")}
        }))
        .into_response(),
    }
}

async fn handle_delete(State(script): State<Arc<Script>>, headers: HeaderMap) -> StatusCode {
    if headers.get("mcp-session-id").and_then(|v| v.to_str().ok()) == Some(SESSION) {
        script.deleted.store(true, Ordering::SeqCst);
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn spawn_server() -> (String, Arc<Script>) {
    let script = Arc::new(Script::default());
    let app = Router::new()
        .route("/mcp", post(handle_post).delete(handle_delete))
        .with_state(Arc::clone(&script));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/mcp"), script)
}

fn config(url: String) -> ClientConfig {
    ClientConfig {
        server_url: url,
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn handshake_list_call_close() {
    let (url, script) = spawn_server().await;
    let client = McpClient::connect(&config(url)).await.unwrap();
    assert_eq!(client.server_info().server_info.name, "scripted");

    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["multiply", "currentTime"]);
    assert_eq!(tools[1].input_schema["type"], "object");

    let result = client.call_tool("multiply", json!({"a": 2, "b": 3})).await.unwrap();
    assert_eq!(result.flatten_text(), "2 multiplied by 3 is 6");

    client.close().await;
    assert!(script.deleted.load(Ordering::SeqCst));
    assert!(!client.is_alive());
    client.close().await;
}

#[tokio::test]
async fn rpc_errors_are_surfaced() {
    let (url, _script) = spawn_server().await;
    let client = McpClient::connect(&config(url)).await.unwrap();
    match client.ping().await {
        Err(McpError::Rpc(err)) => assert_eq!(err.code, -32601),
        other => panic!("expected rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_connection_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = McpClient::connect(&config(format!("http://{addr}/mcp")))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, McpError::Connection { .. }), "{err}");
}
