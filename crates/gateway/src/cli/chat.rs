//! `birdcall chat`: interactive REPL against the MCP server.
//!
//! Connects to the tool server, caches its tool list, then hands each
//! line to the [`Orchestrator`]. `quit` or Ctrl+D exits.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

use bc_domain::config::Config;
use bc_mcp_client::McpClient;
use bc_providers::util::resolve_api_key;
use bc_providers::{GoogleProvider, LlmProvider};

use crate::runtime::{LoopState, Orchestrator, ToolBackend, TurnEvent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    config: Arc<Config>,
    server: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    // 1. Credentials first: a missing key is fatal before any connection.
    let api_key = resolve_api_key(&config.llm.auth).context("Gemini API key")?;
    let provider: Arc<dyn LlmProvider> = Arc::new(GoogleProvider::from_config(&config.llm, api_key)?);

    // 2. Connect. Failure here is fatal and leaves nothing open.
    let client_cfg = super::client_config(&config, server);
    let client = Arc::new(McpClient::connect(&client_cfg).await?);
    println!("Connected to MCP server at {}", client_cfg.server_url);

    let result = repl(&config, provider, Arc::clone(&client), model).await;

    client.close().await;
    println!("Disconnected from MCP server");
    result
}

async fn repl(
    config: &Config,
    provider: Arc<dyn LlmProvider>,
    client: Arc<McpClient>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let backend: Arc<dyn ToolBackend> = client;
    let mut orchestrator = Orchestrator::start(provider, backend, &config.conversation, model)
        .await
        .context("fetching tool list")?;

    print_banner();
    let names: Vec<&str> = orchestrator.tools().iter().map(|t| t.name.as_str()).collect();
    if names.is_empty() {
        println!("No tools available.");
        return Ok(());
    }
    println!("Available tools: {}", names.join(", "));

    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".birdcall")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline("\nQuery: ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    rl.add_history_entry(line.as_str()).ok();
                }

                let (tx, rx) = mpsc::unbounded_channel();
                let (state, ()) = tokio::join!(orchestrator.handle_input(&line, tx), render(rx));
                if state == LoopState::Terminated {
                    break;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Type quit or press Ctrl+D to exit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    Ok(())
}

fn print_banner() {
    println!("Type your queries or 'quit' to exit.");
    println!("To create a tweet, start your message with '!tweet' followed by your tweet text.");
    println!("To use other tools directly, start your message with '!tool' followed by the tool name and JSON arguments.");
    println!("Example: !tweet Hello world!");
    println!("Example: !tool getUserProfile");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event rendering
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn render(mut rx: mpsc::UnboundedReceiver<TurnEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::ModelText { text } => println!("Gemini: {text}"),
            TurnEvent::ToolCall {
                tool_name,
                arguments,
            } => {
                println!("\x1B[2m[tool call] {tool_name} {arguments}\x1B[0m");
            }
            TurnEvent::ToolResult {
                tool_name,
                text,
                is_error,
                direct,
            } => {
                let label = if direct { "Tool Response" } else { "tool result" };
                if is_error {
                    println!("\x1B[31m{label} ({tool_name}): {text}\x1B[0m");
                } else if direct {
                    println!("{label} ({tool_name}): {text}");
                } else {
                    println!("\x1B[2m[{label}] {tool_name}: {text}\x1B[0m");
                }
            }
            TurnEvent::Notice { message } => println!("\x1B[33m{message}\x1B[0m"),
            TurnEvent::Error { message } => println!("\x1B[31m{message}\x1B[0m"),
        }
    }
}
