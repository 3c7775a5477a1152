//! Tools served by the Birdcall MCP server.
//!
//! [`ToolRegistry`] holds the fixed tool set, validates arguments against
//! each tool's schema, and runs the tool. The Twitter tools reach the API
//! through the [`TwitterApi`](twitter::TwitterApi) trait.

pub mod builtin;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod schema;
pub mod twitter;

use std::sync::Arc;

pub use error::ToolError;
pub use registry::{Tool, ToolContext, ToolRegistry};
pub use scheduler::{ScheduleOutcome, ScheduledTweet, TweetScheduler};

use twitter::{DeleteTweet, GetUserProfile, GetUserTweets, ScheduleTweets, Tweet, TwitterApi};

/// The server's tool set, in the order `tools/list` reports it.
pub fn standard_registry(
    api: Arc<dyn TwitterApi>,
    scheduler: Arc<TweetScheduler>,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry
        .register(Tweet::new(Arc::clone(&api)))?
        .register(builtin::CurrentTime)?
        .register(GetUserProfile::new(Arc::clone(&api)))?
        .register(GetUserTweets::new(Arc::clone(&api)))?
        .register(DeleteTweet::new(api))?
        .register(ScheduleTweets::new(scheduler))?
        .register(builtin::Multiply)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use twitter::InMemoryTwitter;

    #[tokio::test]
    async fn standard_registry_order() {
        let api: Arc<dyn TwitterApi> = Arc::new(InMemoryTwitter::default());
        let (scheduler, _rx) = TweetScheduler::new(Arc::clone(&api));
        let registry = standard_registry(api, scheduler).unwrap();
        let names: Vec<&str> = registry.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "tweet",
                "currentTime",
                "getUserProfile",
                "getUserTweets",
                "deleteTweet",
                "scheduleTweets",
                "multiply"
            ]
        );
    }

    #[tokio::test]
    async fn empty_tweet_never_reaches_twitter() {
        let memory = Arc::new(InMemoryTwitter::default());
        let (scheduler, _rx) = TweetScheduler::new(memory.clone());
        let registry = standard_registry(memory.clone(), scheduler).unwrap();
        let err = registry
            .invoke("tweet", serde_json::json!({"tweet": ""}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaValidation { ref field, .. } if field == "tweet"));
        assert!(memory.posted().is_empty());
    }
}
