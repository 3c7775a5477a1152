//! The orchestration loop: one user input in, model rounds and tool
//! calls out, results recorded in the conversation.
//!
//! Entry point: [`Orchestrator::handle_input`]. Progress is reported as
//! [`TurnEvent`]s on a channel so the caller can render while the loop
//! is still waiting on the model or a tool.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use bc_domain::config::ConversationConfig;
use bc_domain::error::{Error, Result};
use bc_domain::tool::{FunctionDeclaration, ToolCall, ToolDescriptor, Turn};
use bc_providers::{ChatRequest, LlmProvider, ResponsePart};

use super::adapter::adapt_all;
use super::backend::ToolBackend;
use super::command::Command;
use super::conversation::ConversationState;

/// Tool used by the `!tweet` shortcut.
const TWEET_TOOL: &str = "tweet";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loop state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoopState {
    AwaitingUserInput,
    /// Waiting on completion `round` (1-based) of the current exchange.
    RequestingCompletion { round: usize },
    AwaitingToolExecution { round: usize },
    /// The exchange finished; the window bound has been applied.
    Done,
    Terminated,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TurnEvent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Events emitted while one input is handled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Text from the model.
    ModelText { text: String },

    /// The model asked for a tool.
    ToolCall { tool_name: String, arguments: Value },

    /// Outcome of a tool call, model-requested or direct.
    ToolResult {
        tool_name: String,
        text: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
        /// `true` for `!tweet` / `!tool` calls, which are not recorded.
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        direct: bool,
    },

    /// Informational message for the user (round cap, unusable response).
    Notice { message: String },

    /// Something failed; the loop carries on.
    Error { message: String },
}

type EventTx = mpsc::UnboundedSender<TurnEvent>;

fn emit(events: &EventTx, event: TurnEvent) {
    // The receiver going away only means nobody is rendering.
    let _ = events.send(event);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Owns the conversation for one chat session.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    backend: Arc<dyn ToolBackend>,
    tools: Vec<ToolDescriptor>,
    declarations: Vec<FunctionDeclaration>,
    conversation: ConversationState,
    max_tool_rounds: usize,
    model: Option<String>,
    state: LoopState,
}

impl Orchestrator {
    /// Fetch the tool list once and build the orchestrator around it.
    pub async fn start(
        provider: Arc<dyn LlmProvider>,
        backend: Arc<dyn ToolBackend>,
        settings: &ConversationConfig,
        model: Option<String>,
    ) -> Result<Self> {
        let tools = backend.list_tools().await?;
        tracing::info!(count = tools.len(), "tool descriptors cached");
        Ok(Self::with_tools(provider, backend, tools, settings, model))
    }

    pub fn with_tools(
        provider: Arc<dyn LlmProvider>,
        backend: Arc<dyn ToolBackend>,
        tools: Vec<ToolDescriptor>,
        settings: &ConversationConfig,
        model: Option<String>,
    ) -> Self {
        let declarations = adapt_all(&tools);
        Self {
            provider,
            backend,
            tools,
            declarations,
            conversation: ConversationState::new(settings.history_cap),
            max_tool_rounds: settings.max_tool_rounds.max(1),
            model,
            state: LoopState::AwaitingUserInput,
        }
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    fn transition(&mut self, next: LoopState) {
        tracing::trace!(from = ?self.state, to = ?next, "loop state");
        self.state = next;
    }

    /// Handle one line of user input.
    ///
    /// Returns `Done` after a model exchange, `Terminated` on `quit`, and
    /// `AwaitingUserInput` for everything that bypasses the model.
    pub async fn handle_input(&mut self, line: &str, events: EventTx) -> LoopState {
        if self.state == LoopState::Terminated {
            return LoopState::Terminated;
        }

        let outcome = match Command::parse(line) {
            Command::Empty => LoopState::AwaitingUserInput,
            Command::Quit => LoopState::Terminated,
            Command::Invalid(message) => {
                emit(&events, TurnEvent::Error { message });
                LoopState::AwaitingUserInput
            }
            Command::DirectTweet(text) => {
                self.direct_call(TWEET_TOOL, serde_json::json!({ "tweet": text }), &events)
                    .await;
                LoopState::AwaitingUserInput
            }
            Command::DirectTool { name, args } => {
                self.direct_tool(&name, &args, &events).await;
                LoopState::AwaitingUserInput
            }
            Command::Chat(text) => {
                self.run_exchange(text, &events).await;
                LoopState::Done
            }
        };

        self.transition(outcome);
        if outcome == LoopState::Done {
            self.transition(LoopState::AwaitingUserInput);
        }
        outcome
    }

    // ── Model-driven path ──────────────────────────────────────────

    async fn run_exchange(&mut self, text: String, events: &EventTx) {
        self.conversation.push(Turn::user(text));

        let mut round = 0;
        loop {
            round += 1;
            self.transition(LoopState::RequestingCompletion { round });

            let request = ChatRequest {
                turns: self.conversation.window().to_vec(),
                tools: self.declarations.clone(),
                model: self.model.clone(),
                ..Default::default()
            };

            let response = match self.provider.chat(&request).await {
                Ok(r) => r,
                Err(Error::MalformedResponse(reason)) => {
                    tracing::warn!(round, reason = %reason, "unusable completion response");
                    emit(
                        events,
                        TurnEvent::Notice {
                            message: format!("The model returned no usable output ({reason})."),
                        },
                    );
                    break;
                }
                Err(e) => {
                    tracing::error!(round, error = %e, "completion request failed");
                    let message = format!("Error: {e}");
                    self.conversation.push(Turn::model_text(message.clone()));
                    emit(events, TurnEvent::Error { message });
                    break;
                }
            };

            let mut called_tools = false;
            for part in response.parts {
                match part {
                    ResponsePart::Text(text) => {
                        self.conversation.push(Turn::model_text(text.clone()));
                        emit(events, TurnEvent::ModelText { text });
                    }
                    ResponsePart::ToolCall(call) => {
                        called_tools = true;
                        self.transition(LoopState::AwaitingToolExecution { round });
                        self.conversation.push(Turn::tool_call(&call));
                        emit(
                            events,
                            TurnEvent::ToolCall {
                                tool_name: call.tool_name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        );

                        let result = self.execute(&call).await;
                        if let Turn::ToolResult {
                            tool_name,
                            text,
                            is_error,
                        } = &result
                        {
                            emit(
                                events,
                                TurnEvent::ToolResult {
                                    tool_name: tool_name.clone(),
                                    text: text.clone(),
                                    is_error: *is_error,
                                    direct: false,
                                },
                            );
                        }
                        self.conversation.push(result);
                    }
                }
            }

            if !called_tools {
                break;
            }
            if round >= self.max_tool_rounds {
                tracing::warn!(rounds = round, "tool round limit reached");
                emit(
                    events,
                    TurnEvent::Notice {
                        message: format!(
                            "Stopped after {round} tool rounds without a final answer."
                        ),
                    },
                );
                break;
            }
        }

        self.transition(LoopState::Done);
        self.conversation.apply_bound();
    }

    /// Run one model-requested call. Always yields a `ToolResult` turn.
    async fn execute(&self, call: &ToolCall) -> Turn {
        let name = call.tool_name.as_str();
        if !self.has_tool(name) {
            tracing::warn!(tool = %name, "model requested unknown tool");
            return Turn::tool_error(name, format!("Tool {name} not found."));
        }

        match self.backend.call_tool(name, call.arguments.clone()).await {
            Ok(result) if result.is_error => Turn::tool_error(name, result.flatten_text()),
            Ok(result) => Turn::tool_result(name, result.flatten_text()),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                Turn::tool_error(name, format!("Error calling tool {name}: {e}"))
            }
        }
    }

    // ── Direct path (never touches the conversation) ───────────────

    async fn direct_tool(&self, name: &str, raw_args: &str, events: &EventTx) {
        if !self.has_tool(name) {
            emit(
                events,
                TurnEvent::Error {
                    message: format!("Tool {name} not found."),
                },
            );
            return;
        }

        let arguments = if raw_args.is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str::<Value>(raw_args) {
                Ok(v) => v,
                Err(e) => {
                    emit(
                        events,
                        TurnEvent::Error {
                            message: format!("Invalid JSON arguments for {name}: {e}"),
                        },
                    );
                    return;
                }
            }
        };

        self.direct_call(name, arguments, events).await;
    }

    async fn direct_call(&self, name: &str, arguments: Value, events: &EventTx) {
        tracing::debug!(tool = %name, "direct tool call");
        let event = match self.backend.call_tool(name, arguments).await {
            Ok(result) => TurnEvent::ToolResult {
                tool_name: name.to_string(),
                text: result.flatten_text(),
                is_error: result.is_error,
                direct: true,
            },
            Err(e) => TurnEvent::Error {
                message: format!("Error in direct call to {name}: {e}"),
            },
        };
        emit(events, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_protocol::ToolCallResult;
    use bc_providers::ChatResponse;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Replays canned responses and records every request.
    struct Scripted {
        responses: Mutex<Vec<Result<ChatResponse>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<ChatResponse>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for Scripted {
        async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().push(req.clone());
            self.responses
                .lock()
                .pop()
                .unwrap_or_else(|| Ok(text_response("(script exhausted)")))
        }
        fn provider_id(&self) -> &str {
            "scripted"
        }
        fn default_model(&self) -> &str {
            "scripted-model"
        }
    }

    struct Echo;

    #[async_trait::async_trait]
    impl ToolBackend for Echo {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
            Ok(vec![ToolDescriptor {
                name: "echo".into(),
                description: "Echo".into(),
                input_schema: json!({"type": "object", "properties": {"s": {"type": "string"}}}),
            }])
        }
        async fn call_tool(&self, _name: &str, arguments: Value) -> Result<ToolCallResult> {
            match arguments["s"].as_str() {
                Some("fail") => Err(Error::Other("boom".into())),
                Some(s) => Ok(ToolCallResult::text(s)),
                None => Ok(ToolCallResult::error("missing s")),
            }
        }
    }

    fn text_response(text: &str) -> ChatResponse {
        ChatResponse {
            parts: vec![ResponsePart::Text(text.into())],
            usage: None,
            model: "scripted-model".into(),
            finish_reason: Some("stop".into()),
        }
    }

    fn call_response(name: &str, args: Value) -> ChatResponse {
        ChatResponse {
            parts: vec![ResponsePart::ToolCall(ToolCall {
                tool_name: name.into(),
                arguments: args,
            })],
            usage: None,
            model: "scripted-model".into(),
            finish_reason: Some("stop".into()),
        }
    }

    async fn orchestrator(provider: Arc<Scripted>, settings: ConversationConfig) -> Orchestrator {
        Orchestrator::start(provider, Arc::new(Echo), &settings, None)
            .await
            .unwrap()
    }

    async fn run(orch: &mut Orchestrator, line: &str) -> (LoopState, Vec<TurnEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = orch.handle_input(line, tx).await;
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        (state, events)
    }

    #[tokio::test]
    async fn quit_terminates_and_stays_terminated() {
        let mut orch = orchestrator(Scripted::new(vec![]), ConversationConfig::default()).await;
        assert_eq!(run(&mut orch, "QUIT").await.0, LoopState::Terminated);
        assert_eq!(orch.state(), LoopState::Terminated);
        assert_eq!(run(&mut orch, "hello").await.0, LoopState::Terminated);
        assert!(orch.conversation().is_empty());
    }

    #[tokio::test]
    async fn every_tool_call_is_paired_with_a_result() {
        let provider = Scripted::new(vec![
            Ok(ChatResponse {
                parts: vec![
                    ResponsePart::ToolCall(ToolCall {
                        tool_name: "nope".into(),
                        arguments: json!({}),
                    }),
                    ResponsePart::ToolCall(ToolCall {
                        tool_name: "echo".into(),
                        arguments: json!({"s": "fail"}),
                    }),
                    ResponsePart::ToolCall(ToolCall {
                        tool_name: "echo".into(),
                        arguments: json!({}),
                    }),
                    ResponsePart::ToolCall(ToolCall {
                        tool_name: "echo".into(),
                        arguments: json!({"s": "ok"}),
                    }),
                ],
                usage: None,
                model: "m".into(),
                finish_reason: None,
            }),
            Ok(text_response("done")),
        ]);
        let settings = ConversationConfig {
            history_cap: 100,
            ..Default::default()
        };
        let mut orch = orchestrator(provider, settings).await;
        run(&mut orch, "go").await;

        let turns = orch.conversation().window();
        for (i, turn) in turns.iter().enumerate() {
            if matches!(turn, Turn::ModelToolCall { .. }) {
                assert!(
                    matches!(turns.get(i + 1), Some(Turn::ToolResult { .. })),
                    "call at {i} not followed by a result: {turns:?}"
                );
            }
        }
        assert_eq!(turns[2], Turn::tool_error("nope", "Tool nope not found."));
        assert_eq!(
            turns[4],
            Turn::tool_error("echo", "Error calling tool echo: boom")
        );
        assert_eq!(turns[6], Turn::tool_error("echo", "missing s"));
        assert_eq!(turns[8], Turn::tool_result("echo", "ok"));
        assert_eq!(turns.last(), Some(&Turn::model_text("done")));
    }

    #[tokio::test]
    async fn malformed_response_appends_nothing() {
        let provider = Scripted::new(vec![Err(Error::MalformedResponse(
            "no candidates in response".into(),
        ))]);
        let mut orch = orchestrator(provider, ConversationConfig::default()).await;
        let (state, events) = run(&mut orch, "hi").await;

        assert_eq!(state, LoopState::Done);
        assert_eq!(orch.conversation().window(), &[Turn::user("hi")]);
        assert!(matches!(&events[..], [TurnEvent::Notice { .. }]));
        assert_eq!(orch.state(), LoopState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn provider_failure_is_recorded_as_model_text() {
        let provider = Scripted::new(vec![Err(Error::Http("connection reset".into()))]);
        let mut orch = orchestrator(provider, ConversationConfig::default()).await;
        let (_, events) = run(&mut orch, "hi").await;

        assert_eq!(
            orch.conversation().window()[1],
            Turn::model_text("Error: HTTP: connection reset")
        );
        assert!(matches!(&events[..], [TurnEvent::Error { .. }]));
    }

    #[tokio::test]
    async fn tool_rounds_stop_at_the_cap() {
        let provider = Scripted::new(vec![
            Ok(call_response("echo", json!({"s": "1"}))),
            Ok(call_response("echo", json!({"s": "2"}))),
            Ok(call_response("echo", json!({"s": "3"}))),
        ]);
        let settings = ConversationConfig {
            history_cap: 100,
            max_tool_rounds: 2,
        };
        let mut orch = orchestrator(provider.clone(), settings).await;
        let (_, events) = run(&mut orch, "loop forever").await;

        assert_eq!(provider.requests.lock().len(), 2);
        assert!(matches!(events.last(), Some(TurnEvent::Notice { .. })));
        // user + 2 × (call, result)
        assert_eq!(orch.conversation().len(), 5);
    }

    #[tokio::test]
    async fn declarations_are_adapted_and_sent() {
        let provider = Scripted::new(vec![Ok(text_response("hello"))]);
        let mut orch = orchestrator(provider.clone(), ConversationConfig::default()).await;
        run(&mut orch, "hi").await;

        let requests = provider.requests.lock();
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].tools[0].name, "echo");
        assert_eq!(requests[0].tools[0].parameters["type"], "object");
        assert_eq!(requests[0].turns, vec![Turn::user("hi")]);
    }

    #[tokio::test]
    async fn direct_tool_call_bypasses_conversation() {
        let provider = Scripted::new(vec![]);
        let mut orch = orchestrator(provider.clone(), ConversationConfig::default()).await;
        let (state, events) = run(&mut orch, r#"!tool echo {"s": "direct"}"#).await;

        assert_eq!(state, LoopState::AwaitingUserInput);
        assert!(orch.conversation().is_empty());
        assert!(provider.requests.lock().is_empty());
        assert_eq!(
            events,
            vec![TurnEvent::ToolResult {
                tool_name: "echo".into(),
                text: "direct".into(),
                is_error: false,
                direct: true,
            }]
        );
    }

    #[tokio::test]
    async fn direct_tool_with_bad_json_reports_error() {
        let mut orch = orchestrator(Scripted::new(vec![]), ConversationConfig::default()).await;
        let (_, events) = run(&mut orch, "!tool echo {not json").await;
        match &events[..] {
            [TurnEvent::Error { message }] => assert!(message.starts_with("Invalid JSON arguments for echo")),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_tweet_command_is_rejected_locally() {
        let mut orch = orchestrator(Scripted::new(vec![]), ConversationConfig::default()).await;
        let (_, events) = run(&mut orch, "!tweet").await;
        assert_eq!(
            events,
            vec![TurnEvent::Error {
                message: "Please provide tweet text after !tweet command".into()
            }]
        );
    }
}
