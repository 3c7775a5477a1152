use serde::Serialize;

/// Structured trace events emitted across all Birdcall crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: String,
    },
    SessionClosed {
        session_id: String,
        reason: String,
        lifetime_secs: i64,
    },
    ToolInvoked {
        tool: String,
        duration_ms: u64,
        is_error: bool,
    },
    TweetScheduled {
        schedule_id: String,
        delay_ms: u64,
    },
    ScheduleCompleted {
        schedule_id: String,
        success: bool,
    },
    LlmRequest {
        provider: String,
        model: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    HistoryTrimmed {
        dropped: usize,
        retained: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "bc_event");
    }
}
