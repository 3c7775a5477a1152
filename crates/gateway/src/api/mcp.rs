//! Streamable-HTTP MCP endpoint.
//!
//! - `POST`   one JSON-RPC message; `initialize` without a session id opens a session
//! - `GET`    server→client notifications for the session, as SSE
//! - `DELETE` close the session

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use bc_protocol::{
    is_initialize_request, methods, IncomingMessage, JsonRpcError, JsonRpcResponse, RequestId,
    SESSION_HEADER,
};
use bc_sessions::{Session, SessionError};

use super::rpc;
use crate::state::AppState;

const INVALID_SESSION_TEXT: &str = "Bad Request: Invalid or missing session ID";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn rpc_reply(status: StatusCode, body: JsonRpcResponse, session: Option<&Session>) -> Response {
    let mut resp = (status, Json(body)).into_response();
    if let Some(value) = session.and_then(|s| HeaderValue::from_str(s.id()).ok()) {
        resp.headers_mut().insert(SESSION_HEADER, value);
    }
    resp
}

fn rpc_error(status: StatusCode, id: Option<RequestId>, error: JsonRpcError) -> Response {
    rpc_reply(status, JsonRpcResponse::failure(id, error), None)
}

/// Best-effort id of a message that failed validation.
fn raw_id(raw: &Value) -> Option<RequestId> {
    raw.get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}

/// Session lookup shared by GET and DELETE.
fn existing_session(state: &AppState, headers: &HeaderMap) -> Result<Arc<Session>, Response> {
    session_id(headers)
        .and_then(|id| state.sessions.get(id))
        .ok_or_else(|| (StatusCode::BAD_REQUEST, INVALID_SESSION_TEXT).into_response())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable JSON-RPC body");
            return rpc_error(StatusCode::BAD_REQUEST, None, JsonRpcError::parse_error(e));
        }
    };

    let requested_id = session_id(&headers);
    let is_init = is_initialize_request(&raw);

    let session = match state.sessions.obtain_session(requested_id, is_init) {
        Ok(s) => s,
        Err(SessionError::InvalidSession) => {
            tracing::debug!(session_id = ?requested_id, is_init, "request without a valid session");
            return rpc_error(StatusCode::BAD_REQUEST, None, JsonRpcError::no_valid_session());
        }
    };

    if is_init && requested_id.is_some() {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            raw_id(&raw),
            JsonRpcError::invalid_request("Server already initialized"),
        );
    }

    let _guard = session.lock_requests().await;

    let message = match IncomingMessage::classify(raw.clone()) {
        Ok(m) => m,
        Err(error) => {
            return rpc_reply(
                StatusCode::BAD_REQUEST,
                JsonRpcResponse::failure(raw_id(&raw), error),
                Some(&session),
            )
        }
    };

    match message {
        IncomingMessage::Notification(n) => {
            if n.method == methods::INITIALIZED {
                tracing::info!(session_id = %session.id(), "client initialized");
            } else {
                tracing::debug!(session_id = %session.id(), method = %n.method, "notification ignored");
            }
            let mut resp = StatusCode::ACCEPTED.into_response();
            if let Ok(value) = HeaderValue::from_str(session.id()) {
                resp.headers_mut().insert(SESSION_HEADER, value);
            }
            resp
        }
        IncomingMessage::Request(req) => {
            let reply = rpc::dispatch(&state, &session, req).await;
            rpc_reply(StatusCode::OK, reply, Some(&session))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Server-push stream. One reader per session; a second concurrent
/// reader gets `409 Conflict`. The stream ends when the session closes.
pub async fn handle_get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match existing_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let Some(mut notifications) = session.take_notifications() else {
        return (
            StatusCode::CONFLICT,
            "Conflict: Only one SSE stream is allowed per session",
        )
            .into_response();
    };

    tracing::debug!(session_id = %session.id(), "notification stream opened");
    let stream = async_stream::stream! {
        while let Some(notification) = notifications.recv().await {
            match Event::default().event("message").json_data(&notification) {
                Ok(event) => yield Ok::<Event, Infallible>(event),
                Err(e) => tracing::warn!(error = %e, "failed to encode notification"),
            }
        }
    };

    let mut resp = Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response();
    if let Ok(value) = HeaderValue::from_str(session.id()) {
        resp.headers_mut().insert(SESSION_HEADER, value);
    }
    resp
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DELETE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match existing_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    state.sessions.close_session(session.id(), "client requested");
    StatusCode::OK.into_response()
}
