use serde::{Deserialize, Serialize};

/// Bounds applied to the chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of most recent turns kept and replayed to the model.
    #[serde(default = "d_10")]
    pub history_cap: usize,
    /// Completion rounds allowed per user input while the model keeps
    /// requesting tools.
    #[serde(default = "d_5")]
    pub max_tool_rounds: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_cap: d_10(),
            max_tool_rounds: d_5(),
        }
    }
}

fn d_10() -> usize {
    10
}
fn d_5() -> usize {
    5
}
