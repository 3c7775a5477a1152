use chrono::{DateTime, Utc};

/// Why a tool invocation did not produce output.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool {0} not found")]
    NotFound(String),

    /// Arguments rejected before the tool ran.
    #[error("Invalid arguments for {field}: {message}")]
    SchemaValidation { field: String, message: String },

    /// The tool ran and failed; carries the underlying message.
    #[error("{0}")]
    Execution(String),

    #[error("tweets[{index}].scheduleTime {at} is in the past")]
    ScheduleInThePast { index: usize, at: DateTime<Utc> },

    #[error("tool {0} is already registered")]
    Duplicate(String),
}

impl ToolError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// `true` if the arguments were refused before any side effect.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::SchemaValidation { .. } | Self::ScheduleInThePast { .. }
        )
    }
}
