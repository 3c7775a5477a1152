use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client (chat side connection to the tool server)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Full URL of the tool server's MCP endpoint.
    #[serde(default = "d_server_url")]
    pub server_url: String,
    /// Name reported in `clientInfo` during `initialize`.
    #[serde(default = "d_client_name")]
    pub client_name: String,
    #[serde(default = "d_30000")]
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: d_server_url(),
            client_name: d_client_name(),
            request_timeout_ms: d_30000(),
        }
    }
}

fn d_server_url() -> String {
    "http://localhost:8000/mcp".into()
}
fn d_client_name() -> String {
    "birdcall-client".into()
}
fn d_30000() -> u64 {
    30_000
}
