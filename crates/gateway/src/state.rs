use std::sync::Arc;

use bc_domain::config::Config;
use bc_sessions::SessionStore;
use bc_tools::{ToolRegistry, TweetScheduler};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Live MCP sessions keyed by `mcp-session-id`.
    pub sessions: Arc<SessionStore>,
    /// The fixed tool set; immutable after startup.
    pub tools: Arc<ToolRegistry>,
    /// Delayed posts created by `scheduleTweets`.
    pub scheduler: Arc<TweetScheduler>,
}
