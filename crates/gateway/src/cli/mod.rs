pub mod chat;
pub mod config;
pub mod tools;

use anyhow::Context;
use clap::{Parser, Subcommand};

use bc_domain::config::Config;

/// Birdcall: a Gemini chat client and the MCP tool server it talks to.
#[derive(Debug, Parser)]
#[command(name = "birdcall", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the MCP tool server (default when no subcommand is given).
    Serve {
        /// Serve the Twitter tools from an in-memory fake instead of the API.
        #[arg(long)]
        dry_run: bool,
    },
    /// Chat with Gemini, letting it call the server's tools.
    Chat {
        /// MCP endpoint URL (overrides `client.server_url`).
        #[arg(long)]
        server: Option<String>,
        /// Gemini model (overrides `llm.model`).
        #[arg(long)]
        model: Option<String>,
    },
    /// Connect to the server and list its tools.
    Tools {
        /// MCP endpoint URL (overrides `client.server_url`).
        #[arg(long)]
        server: Option<String>,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load `.env`, then the configuration from the path in `BC_CONFIG`
/// (`birdcall.toml` by default). A missing file yields the defaults.
/// Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("loading .env");
        }
    }

    let config_path = std::env::var("BC_CONFIG").unwrap_or_else(|_| "birdcall.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    toml::from_str(&raw).with_context(|| format!("parsing {path}"))
}

/// `[client]` settings with an optional `--server` override applied.
pub fn client_config(config: &Config, server: Option<String>) -> bc_domain::config::ClientConfig {
    let mut client = config.client.clone();
    if let Some(url) = server {
        client.server_url = url;
    }
    client
}
