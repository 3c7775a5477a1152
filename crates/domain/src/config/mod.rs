mod client;
mod conversation;
mod llm;
mod observability;
mod server;
mod twitter;

pub use client::*;
pub use conversation::*;
pub use llm::*;
pub use observability::*;
pub use server::*;
pub use twitter::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub twitter: TwitterConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good. Only structural
    /// problems are reported here; missing credentials surface at startup
    /// when the secrets are actually resolved.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if !self.server.endpoint_path.starts_with('/') {
            errors.push(ConfigError::error(
                "server.endpoint_path",
                "endpoint path must start with '/'",
            ));
        }
        if self.server.max_concurrent_requests == 0 {
            errors.push(ConfigError::error(
                "server.max_concurrent_requests",
                "must be greater than 0",
            ));
        }
        if self.server.session_idle_secs == 0 {
            errors.push(ConfigError::warning(
                "server.session_idle_secs",
                "0 disables idle session cleanup",
            ));
        }
        if self.server.cors.allowed_origins.iter().any(|o| o == "*") {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard origin allows any website to call the tool server",
            ));
        }

        if !self.client.server_url.starts_with("http://")
            && !self.client.server_url.starts_with("https://")
        {
            errors.push(ConfigError::error(
                "client.server_url",
                "must be an http:// or https:// URL",
            ));
        }

        if self.llm.model.is_empty() {
            errors.push(ConfigError::error("llm.model", "model must not be empty"));
        }
        if self.llm.base_url.is_empty() {
            errors.push(ConfigError::error("llm.base_url", "base_url must not be empty"));
        }
        if self.llm.auth.key.is_some() {
            errors.push(ConfigError::warning(
                "llm.auth.key",
                "plaintext API key in config; prefer 'env' or keychain",
            ));
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                errors.push(ConfigError::error(
                    "llm.temperature",
                    format!("must be within 0.0..=2.0, got {t}"),
                ));
            }
        }

        if self.conversation.history_cap == 0 {
            errors.push(ConfigError::error(
                "conversation.history_cap",
                "history cap must be at least 1",
            ));
        }
        if self.conversation.max_tool_rounds == 0 {
            errors.push(ConfigError::error(
                "conversation.max_tool_rounds",
                "must allow at least one completion round",
            ));
        }

        if self.twitter.base_url.is_empty() {
            errors.push(ConfigError::error("twitter.base_url", "base_url must not be empty"));
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "sample rate must be within 0.0..=1.0",
            ));
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_errors() {
        let issues = Config::default().validate();
        assert!(
            issues.iter().all(|i| i.severity != ConfigSeverity::Error),
            "unexpected errors: {issues:?}"
        );
    }

    #[test]
    fn zero_history_cap_is_an_error() {
        let mut cfg = Config::default();
        cfg.conversation.history_cap = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "conversation.history_cap" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn relative_endpoint_path_is_an_error() {
        let mut cfg = Config::default();
        cfg.server.endpoint_path = "mcp".into();
        assert!(cfg.validate().iter().any(|i| i.field == "server.endpoint_path"));
    }

    #[test]
    fn plaintext_key_is_a_warning() {
        let mut cfg = Config::default();
        cfg.llm.auth.key = Some("secret".into());
        let issue = cfg
            .validate()
            .into_iter()
            .find(|i| i.field == "llm.auth.key")
            .unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn display_includes_severity_tag() {
        let e = ConfigError::error("server.port", "port must be greater than 0");
        assert_eq!(e.to_string(), "[ERROR] server.port: port must be greater than 0");
    }
}
