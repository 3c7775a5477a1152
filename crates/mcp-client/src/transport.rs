//! MCP transport layer.
//!
//! The client talks to the tool server over streamable HTTP: every
//! JSON-RPC message is a POST to the endpoint, and the reply arrives either
//! as a plain JSON body or as a short `text/event-stream` body.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use bc_protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, SESSION_HEADER};

use crate::sse::drain_data_lines;

/// Trait for MCP server transports.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a JSON-RPC request and wait for the corresponding response.
    async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<JsonRpcResponse, TransportError>;

    /// Send a JSON-RPC notification (no response expected).
    async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), TransportError>;

    /// Check if the transport is still usable.
    fn is_alive(&self) -> bool;

    /// Terminate the session on the server and stop accepting requests.
    async fn shutdown(&self);
}

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected content type: {0}")]
    UnexpectedContentType(String),

    #[error("response stream ended without a reply to request {0}")]
    NoResponse(RequestId),

    #[error("timeout waiting for response")]
    Timeout,

    #[error("transport is closed")]
    Closed,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streamable HTTP transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Streamable-HTTP transport.
///
/// The `request_lock` serializes whole request/response cycles so the
/// session id captured from `initialize` is in place before the next
/// request goes out.
pub struct StreamableHttpTransport {
    url: String,
    client: reqwest::Client,
    session_id: Mutex<Option<String>>,
    request_lock: tokio::sync::Mutex<()>,
    next_id: AtomicI64,
    alive: AtomicBool,
}

impl StreamableHttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
            session_id: Mutex::new(None),
            request_lock: tokio::sync::Mutex::new(()),
            next_id: AtomicI64::new(0),
            alive: AtomicBool::new(true),
        })
    }

    /// Session id assigned by the server, once initialized.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    fn next_request_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn ensure_alive(&self) -> Result<(), TransportError> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }

    async fn post(&self, body: String) -> Result<reqwest::Response, TransportError> {
        let mut req = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_BOTH)
            .body(body);
        if let Some(id) = self.session_id() {
            req = req.header(SESSION_HEADER, id);
        }
        let resp = req.send().await?;

        if let Some(id) = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let mut current = self.session_id.lock();
            if current.as_deref() != Some(id) {
                tracing::debug!(session_id = %id, "MCP session established");
                *current = Some(id.to_owned());
            }
        }
        Ok(resp)
    }

    /// Read an SSE body until the response carrying `id` shows up.
    async fn read_event_stream(
        mut resp: reqwest::Response,
        id: &RequestId,
    ) -> Result<JsonRpcResponse, TransportError> {
        let mut buffer = String::new();
        loop {
            let chunk = resp.chunk().await?;
            let finished = chunk.is_none();
            match chunk {
                Some(bytes) => buffer.push_str(&String::from_utf8_lossy(&bytes)),
                None => buffer.push_str("\n\n"),
            }

            for data in drain_data_lines(&mut buffer) {
                match serde_json::from_str::<JsonRpcResponse>(&data) {
                    Ok(msg) if msg.id.as_ref() == Some(id) => return Ok(msg),
                    Ok(msg) => {
                        tracing::debug!(expected = %id, got = ?msg.id, "skipping response for another request");
                    }
                    // Server notifications interleaved on the stream.
                    Err(_) => tracing::debug!(payload = %data, "skipping non-response SSE message"),
                }
            }

            if finished {
                return Err(TransportError::NoResponse(id.clone()));
            }
        }
    }
}

#[async_trait]
impl McpTransport for StreamableHttpTransport {
    async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<JsonRpcResponse, TransportError> {
        self.ensure_alive()?;
        let _guard = self.request_lock.lock().await;

        let req = JsonRpcRequest::new(self.next_request_id(), method, params);
        let body = serde_json::to_string(&req)?;
        tracing::debug!(id = %req.id, method, "sending MCP request");

        let resp = self.post(body).await?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("text/event-stream") && status.is_success() {
            return Self::read_event_stream(resp, &req.id).await;
        }

        let text = resp.text().await?;
        // Error statuses may still carry a JSON-RPC error body (e.g. an
        // invalid session); surface that instead of the bare status.
        match serde_json::from_str::<JsonRpcResponse>(&text) {
            Ok(msg) if status.is_success() || msg.is_error() => Ok(msg),
            _ if !status.is_success() => Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            }),
            Err(_) if !content_type.starts_with("application/json") => {
                Err(TransportError::UnexpectedContentType(content_type))
            }
            Err(e) => Err(TransportError::Json(e)),
            Ok(msg) => Ok(msg),
        }
    }

    async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), TransportError> {
        self.ensure_alive()?;
        let _guard = self.request_lock.lock().await;

        let body = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        tracing::debug!(method, "sending MCP notification");
        let resp = self.post(body).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            })
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        let _guard = self.request_lock.lock().await;
        let Some(id) = self.session_id.lock().take() else {
            return;
        };
        match self
            .client
            .delete(&self.url)
            .header(SESSION_HEADER, &id)
            .send()
            .await
        {
            Ok(resp)
                if resp.status().is_success() || resp.status() == StatusCode::METHOD_NOT_ALLOWED =>
            {
                tracing::debug!(session_id = %id, "MCP session terminated");
            }
            Ok(resp) => {
                tracing::debug!(
                    session_id = %id,
                    status = resp.status().as_u16(),
                    "session DELETE rejected"
                );
            }
            Err(e) => tracing::debug!(session_id = %id, error = %e, "session DELETE failed"),
        }
    }
}
