use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Twitter API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the Twitter v2 API lives and which env vars carry the four
/// OAuth 1.0a credentials. The secrets themselves never live in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_api_secret_env")]
    pub api_secret_env: String,
    #[serde(default = "d_access_token_env")]
    pub access_token_env: String,
    #[serde(default = "d_access_token_secret_env")]
    pub access_token_secret_env: String,
    #[serde(default = "d_20000")]
    pub timeout_ms: u64,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            api_key_env: d_api_key_env(),
            api_secret_env: d_api_secret_env(),
            access_token_env: d_access_token_env(),
            access_token_secret_env: d_access_token_secret_env(),
            timeout_ms: d_20000(),
        }
    }
}

impl TwitterConfig {
    /// The credential env var names, in the order they are resolved.
    pub fn credential_envs(&self) -> [&str; 4] {
        [
            self.api_key_env.as_str(),
            self.api_secret_env.as_str(),
            self.access_token_env.as_str(),
            self.access_token_secret_env.as_str(),
        ]
    }
}

fn d_base_url() -> String {
    "https://api.twitter.com/2".into()
}
fn d_api_key_env() -> String {
    "TWITTER_API_KEY".into()
}
fn d_api_secret_env() -> String {
    "TWITTER_API_SECRET".into()
}
fn d_access_token_env() -> String {
    "TWITTER_ACCESS_TOKEN".into()
}
fn d_access_token_secret_env() -> String {
    "TWITTER_ACCESS_TOKEN_SECRET".into()
}
fn d_20000() -> u64 {
    20_000
}
