//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent` API. The key travels in the
//! `x-goog-api-key` header, or as a `key=` query parameter when the config
//! asks for it.

use crate::traits::{ChatRequest, ChatResponse, LlmProvider, ResponsePart, Usage};
use crate::util::from_reqwest;
use bc_domain::config::{AuthMode, LlmConfig};
use bc_domain::error::{Error, Result};
use bc_domain::tool::{FunctionDeclaration, ToolCall, Turn};
use bc_domain::trace::TraceEvent;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const PROVIDER_ID: &str = "google";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for the Google Gemini API.
pub struct GoogleProvider {
    base_url: String,
    api_key: String,
    auth_mode: AuthMode,
    default_model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("auth_mode", &self.auth_mode)
            .finish_non_exhaustive()
    }
}

impl GoogleProvider {
    /// Create a provider from the `[llm]` config section and an already
    /// resolved API key.
    pub fn from_config(cfg: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            auth_mode: cfg.auth.mode,
            default_model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            client,
        })
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn generate_url(&self, model: &str) -> String {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        match self.auth_mode {
            AuthMode::Header => url,
            AuthMode::QueryParam => format!("{url}?key={}", urlencoding::encode(&self.api_key)),
        }
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let mut body = json!({ "contents": turns_to_contents(&req.turns) });

        if !req.tools.is_empty() {
            let declarations: Vec<Value> = req.tools.iter().map(declaration_to_gemini).collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        let mut gen_config = json!({});
        if let Some(temp) = req.temperature.or(self.temperature) {
            gen_config["temperature"] = json!(temp);
        }
        if let Some(max) = req.max_tokens.or(self.max_tokens) {
            gen_config["maxOutputTokens"] = json!(max);
        }
        if gen_config.as_object().is_some_and(|o| !o.is_empty()) {
            body["generationConfig"] = gen_config;
        }

        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn serialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Render the turn log as Gemini `contents`.
///
/// Consecutive parts with the same role are merged into one content entry.
/// A tool result whose call is no longer in the window (trimmed away) is
/// sent as plain user text, since Gemini rejects a `functionResponse`
/// without a matching `functionCall`.
///
/// Gemini also rejects a `functionCall` that does not follow a user turn,
/// so model turns left at the front of a trimmed window are replayed as
/// user-role text until the first user content.
fn turns_to_contents(turns: &[Turn]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::new();
    let mut open_calls: Vec<&str> = Vec::new();
    // Set once a user-role content exists.
    let mut anchored = false;

    for turn in turns {
        match turn {
            Turn::User { text } => {
                open_calls.clear();
                anchored = true;
                push_part(&mut contents, "user", json!({ "text": text }));
            }
            Turn::ModelText { text } if !anchored => {
                let note = format!("Earlier reply: {text}");
                push_part(&mut contents, "user", json!({ "text": note }));
            }
            Turn::ModelText { text } => {
                push_part(&mut contents, "model", json!({ "text": text }));
            }
            Turn::ModelToolCall {
                tool_name,
                arguments,
            } if !anchored => {
                let note = format!("Called {tool_name} with {arguments}");
                push_part(&mut contents, "user", json!({ "text": note }));
            }
            Turn::ModelToolCall {
                tool_name,
                arguments,
            } => {
                open_calls.push(tool_name);
                push_part(
                    &mut contents,
                    "model",
                    json!({ "functionCall": { "name": tool_name, "args": arguments } }),
                );
            }
            Turn::ToolResult {
                tool_name,
                text,
                is_error,
            } => {
                let matched = open_calls.iter().position(|n| *n == tool_name.as_str());
                let part = match matched {
                    Some(idx) => {
                        open_calls.remove(idx);
                        let key = if *is_error { "error" } else { "content" };
                        json!({
                            "functionResponse": {
                                "name": tool_name,
                                "response": { key: text },
                            }
                        })
                    }
                    None => json!({ "text": format!("Result of {tool_name}: {text}") }),
                };
                anchored = true;
                push_part(&mut contents, "user", part);
            }
        }
    }

    contents
}

fn push_part(contents: &mut Vec<Value>, role: &str, part: Value) {
    if let Some(last) = contents.last_mut() {
        if last["role"] == role {
            if let Some(parts) = last["parts"].as_array_mut() {
                parts.push(part);
                return;
            }
        }
    }
    contents.push(json!({ "role": role, "parts": [part] }));
}

fn declaration_to_gemini(decl: &FunctionDeclaration) -> Value {
    json!({
        "name": decl.name,
        "description": decl.description,
        "parameters": decl.parameters,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    /// Kept untyped so a non-array value is reported, not silently dropped.
    parts: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    total_token_count: Option<u32>,
}

/// Decode a `generateContent` body into ordered response parts.
///
/// No candidates, a first candidate without content, or a `parts` field
/// that is not an array yield [`Error::MalformedResponse`].
pub fn decode_response(body: &str, model: &str) -> Result<ChatResponse> {
    let resp: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("response is not valid JSON: {e}")))?;

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::MalformedResponse("no candidates in response".into()))?;

    let content = candidate
        .content
        .ok_or_else(|| Error::MalformedResponse("candidate has no content".into()))?;

    let raw_parts = match content.parts {
        Some(Value::Array(parts)) => parts,
        _ => {
            return Err(Error::MalformedResponse(
                "candidate content parts is not an array".into(),
            ))
        }
    };

    let mut parts = Vec::with_capacity(raw_parts.len());
    for raw in raw_parts {
        let part: WirePart = match serde_json::from_value(raw) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable response part");
                continue;
            }
        };
        if let Some(text) = part.text.filter(|t| !t.is_empty()) {
            parts.push(ResponsePart::Text(text));
        }
        if let Some(call) = part.function_call {
            parts.push(ResponsePart::ToolCall(ToolCall {
                tool_name: call.name,
                arguments: call
                    .args
                    .filter(|a| !a.is_null())
                    .unwrap_or_else(|| json!({})),
            }));
        }
    }

    let finish_reason = candidate.finish_reason.map(|s| match s.as_str() {
        "STOP" => "stop".to_string(),
        "MAX_TOKENS" => "length".to_string(),
        other => other.to_lowercase(),
    });

    let usage = resp.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u
            .total_token_count
            .unwrap_or(u.prompt_token_count + u.candidates_token_count),
    });

    Ok(ChatResponse {
        parts,
        usage,
        model: resp.model_version.unwrap_or_else(|| model.to_string()),
        finish_reason,
    })
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Redact API key from URL for safe logging.
fn redact_url_key(url: &str) -> String {
    if let Some(idx) = url.find("key=") {
        let prefix = &url[..idx + 4];
        let rest = &url[idx + 4..];
        let end = rest.find('&').unwrap_or(rest.len());
        format!("{prefix}[REDACTED]{}", &rest[end..])
    } else {
        url.to_string()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let url = self.generate_url(&model);
        let body = self.build_body(req);

        tracing::debug!(
            provider = PROVIDER_ID,
            url = %redact_url_key(&url),
            turns = req.turns.len(),
            tools = req.tools.len(),
            "gemini chat request"
        );

        let started = Instant::now();
        let mut builder = self.client.post(&url).json(&body);
        if self.auth_mode == AuthMode::Header {
            builder = builder.header("x-goog-api-key", &self.api_key);
        }
        let resp = builder.send().await.map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: PROVIDER_ID.into(),
                message: format!("HTTP {} - {}", status.as_u16(), error_message(&resp_text)),
            });
        }

        let decoded = decode_response(&resp_text, &model)?;

        TraceEvent::LlmRequest {
            provider: PROVIDER_ID.into(),
            model: decoded.model.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: decoded.usage.map(|u| u.prompt_tokens),
            completion_tokens: decoded.usage.map(|u| u.completion_tokens),
        }
        .emit();

        Ok(decoded)
    }

    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn provider(mode: AuthMode) -> GoogleProvider {
        let mut cfg = LlmConfig::default();
        cfg.auth.mode = mode;
        GoogleProvider::from_config(&cfg, "test-key").unwrap()
    }

    // ── decode_response ──────────────────────────────────────────────

    #[test]
    fn decodes_text_and_function_call_in_order() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Let me multiply."},
                    {"functionCall": {"name": "multiply", "args": {"a": 6, "b": 7}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
        }"#;
        let resp = decode_response(body, "gemini-2.0-flash").unwrap();
        assert_eq!(
            resp.parts,
            vec![
                ResponsePart::Text("Let me multiply.".into()),
                ResponsePart::ToolCall(ToolCall {
                    tool_name: "multiply".into(),
                    arguments: json!({"a": 6, "b": 7}),
                }),
            ]
        );
        assert!(resp.has_tool_calls());
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.unwrap().total_tokens, 17);
        assert_eq!(resp.model, "gemini-2.0-flash");
    }

    #[test]
    fn function_call_without_args_gets_empty_object() {
        let body = r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"currentTime"}}]}}]}"#;
        let resp = decode_response(body, "m").unwrap();
        match &resp.parts[0] {
            ResponsePart::ToolCall(call) => assert_eq!(call.arguments, json!({})),
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn no_candidates_is_malformed() {
        for body in [r#"{}"#, r#"{"candidates": []}"#] {
            let err = decode_response(body, "m").unwrap_err();
            assert!(matches!(err, Error::MalformedResponse(_)), "{body}");
        }
    }

    #[test]
    fn candidate_without_content_is_malformed() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let err = decode_response(body, "m").unwrap_err();
        assert!(err.to_string().contains("no content"));
    }

    #[test]
    fn non_array_parts_is_malformed() {
        for body in [
            r#"{"candidates":[{"content":{"parts":"hello"}}]}"#,
            r#"{"candidates":[{"content":{"role":"model"}}]}"#,
        ] {
            let err = decode_response(body, "m").unwrap_err();
            assert!(err.to_string().contains("not an array"), "{body}");
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            decode_response("<html>", "m"),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn empty_parts_array_decodes_to_no_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[]}}]}"#;
        let resp = decode_response(body, "m").unwrap();
        assert!(resp.parts.is_empty());
        assert!(!resp.has_tool_calls());
    }

    // ── build_body ───────────────────────────────────────────────────

    #[test]
    fn tool_round_renders_as_call_then_function_response() {
        let call = ToolCall {
            tool_name: "multiply".into(),
            arguments: json!({"a": 6, "b": 7}),
        };
        let turns = vec![
            Turn::user("what is 6 times 7?"),
            Turn::tool_call(&call),
            Turn::tool_result("multiply", "6 multiplied by 7 is 42"),
            Turn::model_text("42"),
        ];
        let contents = turns_to_contents(&turns);
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "multiply");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["content"],
            "6 multiplied by 7 is 42"
        );
        assert_eq!(contents[3]["parts"][0]["text"], "42");
    }

    #[test]
    fn consecutive_same_role_parts_merge() {
        let call = ToolCall {
            tool_name: "currentTime".into(),
            arguments: json!({}),
        };
        let turns = vec![
            Turn::user("hi"),
            Turn::model_text("checking"),
            Turn::tool_call(&call),
            Turn::tool_error("currentTime", "boom"),
            Turn::user("ok"),
        ];
        let contents = turns_to_contents(&turns);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["parts"].as_array().unwrap().len(), 2);
        let user_parts = contents[2]["parts"].as_array().unwrap();
        assert_eq!(user_parts.len(), 2);
        assert_eq!(user_parts[0]["functionResponse"]["response"]["error"], "boom");
        assert_eq!(user_parts[1]["text"], "ok");
    }

    #[test]
    fn orphaned_tool_result_is_sent_as_text() {
        let turns = vec![Turn::tool_result("multiply", "2 multiplied by 3 is 6")];
        let contents = turns_to_contents(&turns);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(
            contents[0]["parts"][0]["text"],
            "Result of multiply: 2 multiplied by 3 is 6"
        );
    }

    #[test]
    fn call_left_at_window_front_is_not_sent_as_function_call() {
        let turns = vec![
            Turn::tool_call(&ToolCall {
                tool_name: "multiply".into(),
                arguments: json!({"a": 2, "b": 3}),
            }),
            Turn::tool_result("multiply", "2 multiplied by 3 is 6"),
            Turn::model_text("The result is 6."),
            Turn::user("and 4 times 5?"),
        ];
        let contents = turns_to_contents(&turns);

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(
            contents[0]["parts"],
            json!([
                {"text": r#"Called multiply with {"a":2,"b":3}"#},
                {"text": "Result of multiply: 2 multiplied by 3 is 6"},
            ])
        );
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "The result is 6.");
        assert_eq!(contents[2]["role"], "user");
        assert!(!serde_json::to_string(&contents).unwrap().contains("functionCall"));
    }

    #[test]
    fn leading_model_text_becomes_user_context() {
        let turns = vec![Turn::model_text("Hello!"), Turn::user("hi")];
        let contents = turns_to_contents(&turns);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Earlier reply: Hello!");
        assert_eq!(contents[0]["parts"][1]["text"], "hi");
    }

    #[test]
    fn call_after_orphaned_result_keeps_function_call() {
        let turns = vec![
            Turn::tool_result("currentTime", "noon"),
            Turn::tool_call(&ToolCall {
                tool_name: "multiply".into(),
                arguments: json!({"a": 1, "b": 1}),
            }),
            Turn::tool_result("multiply", "1 multiplied by 1 is 1"),
        ];
        let contents = turns_to_contents(&turns);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "multiply");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["content"],
            "1 multiplied by 1 is 1"
        );
    }

    #[test]
    fn body_carries_declarations_and_generation_config() {
        let p = provider(AuthMode::Header);
        let req = ChatRequest {
            turns: vec![Turn::user("hi")],
            tools: vec![FunctionDeclaration {
                name: "multiply".into(),
                description: "Multiply two numbers".into(),
                parameters: json!({"type": "object", "properties": {}}),
            }],
            temperature: Some(0.2),
            max_tokens: Some(256),
            model: None,
        };
        let body = p.build_body(&req);
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "multiply");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert!(body["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn body_omits_empty_tools_and_config() {
        let p = provider(AuthMode::Header);
        let body = p.build_body(&ChatRequest {
            turns: vec![Turn::user("hi")],
            ..Default::default()
        });
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn url_shape_follows_auth_mode() {
        assert_eq!(
            provider(AuthMode::Header).generate_url("gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        let url = provider(AuthMode::QueryParam).generate_url("m");
        assert!(url.ends_with(":generateContent?key=test-key"));
        assert_eq!(
            redact_url_key(&url),
            "https://generativelanguage.googleapis.com/v1beta/models/m:generateContent?key=[REDACTED]"
        );
    }

    #[test]
    fn error_message_prefers_gemini_error_field() {
        assert_eq!(
            error_message(r#"{"error":{"code":400,"message":"API key not valid"}}"#),
            "API key not valid"
        );
        assert_eq!(error_message("gateway down\n"), "gateway down");
    }

    // ── end to end against a local stub ─────────────────────────────

    #[derive(Clone, Default)]
    struct Seen {
        key_header: Arc<Mutex<Option<String>>>,
        path: Arc<Mutex<Option<String>>>,
    }

    async fn stub_generate(
        State(seen): State<Seen>,
        Path(model_call): Path<String>,
        headers: HeaderMap,
        Query(_q): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        *seen.path.lock().unwrap() = Some(model_call);
        *seen.key_header.lock().unwrap() = headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if body["contents"][0]["parts"][0]["text"] == "fail" {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"error": {"code": 429, "message": "quota exhausted"}})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "pong"}]}, "finishReason": "STOP"}],
                "modelVersion": "gemini-2.0-flash-001"
            })),
        )
    }

    async fn spawn_stub(seen: Seen) -> String {
        let app = Router::new()
            .route("/v1beta/models/:model_call", post(stub_generate))
            .with_state(seen);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta")
    }

    #[tokio::test]
    async fn chat_round_trips_against_stub() {
        let seen = Seen::default();
        let base = spawn_stub(seen.clone()).await;
        let cfg = LlmConfig {
            base_url: base,
            ..LlmConfig::default()
        };
        let p = GoogleProvider::from_config(&cfg, "secret").unwrap();

        let resp = p
            .chat(&ChatRequest {
                turns: vec![Turn::user("ping")],
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(resp.parts, vec![ResponsePart::Text("pong".into())]);
        assert_eq!(resp.model, "gemini-2.0-flash-001");
        assert_eq!(seen.key_header.lock().unwrap().as_deref(), Some("secret"));
        assert_eq!(
            seen.path.lock().unwrap().as_deref(),
            Some("gemini-2.0-flash:generateContent")
        );
    }

    #[tokio::test]
    async fn http_error_surfaces_gemini_message() {
        let base = spawn_stub(Seen::default()).await;
        let cfg = LlmConfig {
            base_url: base,
            ..LlmConfig::default()
        };
        let p = GoogleProvider::from_config(&cfg, "secret").unwrap();

        let err = p
            .chat(&ChatRequest {
                turns: vec![Turn::user("fail")],
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            Error::Provider { provider, message } => {
                assert_eq!(provider, "google");
                assert_eq!(message, "HTTP 429 - quota exhausted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
