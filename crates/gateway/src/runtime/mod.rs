//! Client-side runtime: schema adaptation, conversation state and the
//! tool-calling orchestration loop.

pub mod adapter;
pub mod backend;
pub mod command;
pub mod conversation;
pub mod turn;

pub use backend::ToolBackend;
pub use command::Command;
pub use conversation::ConversationState;
pub use turn::{LoopState, Orchestrator, TurnEvent};
