//! LLM access for the chat client: the provider-agnostic [`LlmProvider`]
//! trait and the Google Gemini adapter.

pub mod google;
pub mod traits;
pub mod util;

pub use google::GoogleProvider;
pub use traits::{ChatRequest, ChatResponse, LlmProvider, ResponsePart, Usage};
