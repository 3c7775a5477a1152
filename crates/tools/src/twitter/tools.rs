use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use bc_protocol::ToolCallResult;

use crate::error::ToolError;
use crate::registry::{Tool, ToolContext};
use crate::scheduler::TweetScheduler;
use crate::schema::parse_date_time;

use super::client::TwitterApi;

const MAX_TWEET_CHARS: u64 = 280;

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::invalid("arguments", e.to_string()))
}

// ── tweet ───────────────────────────────────────────────────────────

pub struct Tweet {
    api: Arc<dyn TwitterApi>,
}

impl Tweet {
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for Tweet {
    fn name(&self) -> &str {
        "tweet"
    }

    fn description(&self) -> &str {
        "create a tweet"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tweet": { "type": "string", "minLength": 1, "maxLength": MAX_TWEET_CHARS }
            },
            "required": ["tweet"],
            "additionalProperties": false,
            "$schema": "http://json-schema.org/draft-07/schema#"
        })
    }

    async fn call(&self, _ctx: &ToolContext, args: Value) -> Result<ToolCallResult, ToolError> {
        #[derive(Deserialize)]
        struct Args {
            tweet: String,
        }
        let Args { tweet } = parse_args(args)?;

        let posted = self
            .api
            .create_tweet(&tweet)
            .await
            .map_err(|e| ToolError::Execution(format!("Failed to create tweet: {e}")))?;
        let text = posted.get("text").and_then(Value::as_str).unwrap_or(&tweet);
        Ok(ToolCallResult::text(format!("Tweet created successfully: {text}")))
    }
}

// ── getUserProfile ──────────────────────────────────────────────────

pub struct GetUserProfile {
    api: Arc<dyn TwitterApi>,
}

impl GetUserProfile {
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for GetUserProfile {
    fn name(&self) -> &str {
        "getUserProfile"
    }

    fn description(&self) -> &str {
        "retrieve a Twitter user's profile"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<ToolCallResult, ToolError> {
        let profile = self
            .api
            .me()
            .await
            .map_err(|e| ToolError::Execution(format!("Failed to fetch user profile: {e}")))?;
        Ok(ToolCallResult::text(format!("User Profile: {}", pretty(&profile))))
    }
}

// ── getUserTweets ───────────────────────────────────────────────────

pub struct GetUserTweets {
    api: Arc<dyn TwitterApi>,
}

impl GetUserTweets {
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for GetUserTweets {
    fn name(&self) -> &str {
        "getUserTweets"
    }

    fn description(&self) -> &str {
        "retrieve a user's recent tweets"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "maxResults": { "type": "integer", "minimum": 5, "maximum": 100, "default": 10 }
            },
            "additionalProperties": false
        })
    }

    async fn call(&self, _ctx: &ToolContext, args: Value) -> Result<ToolCallResult, ToolError> {
        let max_results = args
            .get("maxResults")
            .and_then(Value::as_f64)
            .map(|n| n as u32)
            .unwrap_or(10);
        let tweets = self
            .api
            .user_tweets(max_results)
            .await
            .map_err(|e| ToolError::Execution(format!("Failed to fetch tweets: {e}")))?;
        Ok(ToolCallResult::text(format!("Recent Tweets: {}", pretty(&tweets))))
    }
}

// ── deleteTweet ─────────────────────────────────────────────────────

pub struct DeleteTweet {
    api: Arc<dyn TwitterApi>,
}

impl DeleteTweet {
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for DeleteTweet {
    fn name(&self) -> &str {
        "deleteTweet"
    }

    fn description(&self) -> &str {
        "delete a specific tweet by ID"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tweetId": { "type": "string", "minLength": 1 }
            },
            "required": ["tweetId"],
            "additionalProperties": false
        })
    }

    async fn call(&self, _ctx: &ToolContext, args: Value) -> Result<ToolCallResult, ToolError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            tweet_id: String,
        }
        let Args { tweet_id } = parse_args(args)?;

        let result = self
            .api
            .delete_tweet(&tweet_id)
            .await
            .map_err(|e| ToolError::Execution(format!("Failed to delete tweet: {e}")))?;
        Ok(ToolCallResult::text(format!(
            "Tweet deleted successfully: {}",
            serde_json::to_string(&result).unwrap_or_default()
        )))
    }
}

// ── scheduleTweets ──────────────────────────────────────────────────

pub struct ScheduleTweets {
    scheduler: Arc<TweetScheduler>,
}

impl ScheduleTweets {
    pub fn new(scheduler: Arc<TweetScheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait::async_trait]
impl Tool for ScheduleTweets {
    fn name(&self) -> &str {
        "scheduleTweets"
    }

    fn description(&self) -> &str {
        "schedule multiple tweets for future posting"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tweets": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "text": { "type": "string", "minLength": 1, "maxLength": MAX_TWEET_CHARS },
                            "scheduleTime": {
                                "type": "string",
                                "format": "date-time",
                                "description": "when to post, e.g. 2030-01-01T09:00:00Z"
                            }
                        },
                        "required": ["text", "scheduleTime"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["tweets"],
            "additionalProperties": false
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<ToolCallResult, ToolError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Entry {
            text: String,
            schedule_time: String,
        }
        #[derive(Deserialize)]
        struct Args {
            tweets: Vec<Entry>,
        }
        let Args { tweets } = parse_args(args)?;

        // All-or-nothing: every time is checked before anything is spawned.
        let now = Utc::now();
        let mut plan = Vec::with_capacity(tweets.len());
        for (index, entry) in tweets.into_iter().enumerate() {
            let at = parse_date_time(&entry.schedule_time).ok_or_else(|| {
                ToolError::invalid(format!("tweets[{index}].scheduleTime"), "Invalid date format")
            })?;
            if at <= now {
                return Err(ToolError::ScheduleInThePast { index, at });
            }
            plan.push((entry.text, at));
        }

        let scheduled: Vec<_> = plan
            .into_iter()
            .map(|(text, at)| self.scheduler.schedule(ctx.session_id.clone(), text, at))
            .collect();
        tracing::info!(count = scheduled.len(), session_id = ?ctx.session_id, "tweets scheduled");

        Ok(ToolCallResult::text(format!(
            "Tweets scheduled successfully: {}",
            serde_json::to_string_pretty(&scheduled).unwrap_or_default()
        )))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::InMemoryTwitter;

    fn ctx() -> ToolContext {
        ToolContext {
            session_id: Some("s-1".into()),
        }
    }

    #[tokio::test]
    async fn tweet_reports_posted_text() {
        let api = Arc::new(InMemoryTwitter::default());
        let out = Tweet::new(api.clone())
            .call(&ctx(), json!({"tweet": "hello world"}))
            .await
            .unwrap();
        assert_eq!(out.flatten_text(), "Tweet created successfully: hello world");
        assert_eq!(api.posted(), vec!["hello world".to_string()]);
    }

    #[tokio::test]
    async fn tweet_failure_is_execution_error() {
        let api = Arc::new(InMemoryTwitter::failing("403 Forbidden"));
        let err = Tweet::new(api).call(&ctx(), json!({"tweet": "x"})).await.unwrap_err();
        match err {
            ToolError::Execution(msg) => assert!(msg.contains("403 Forbidden"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn user_tweets_defaults_to_ten() {
        let api = Arc::new(InMemoryTwitter::default());
        for i in 0..12 {
            api.create_tweet(&format!("t{i}")).await.unwrap();
        }
        let out = GetUserTweets::new(api).call(&ctx(), json!({})).await.unwrap();
        let text = out.flatten_text();
        assert!(text.starts_with("Recent Tweets: "));
        let list: Value = serde_json::from_str(text.trim_start_matches("Recent Tweets: ")).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn delete_reports_result_json() {
        let api = Arc::new(InMemoryTwitter::default());
        api.create_tweet("bye").await.unwrap();
        let out = DeleteTweet::new(api.clone())
            .call(&ctx(), json!({"tweetId": "1"}))
            .await
            .unwrap();
        assert_eq!(out.flatten_text(), r#"Tweet deleted successfully: {"deleted":true}"#);
        assert!(api.posted().is_empty());
    }

    fn tomorrow() -> String {
        (Utc::now() + chrono::Duration::days(1)).to_rfc3339()
    }

    #[tokio::test]
    async fn schedule_rejects_past_time_without_spawning() {
        let api = Arc::new(InMemoryTwitter::default());
        let (scheduler, _rx) = TweetScheduler::new(api);
        let tool = ScheduleTweets::new(scheduler.clone());
        let err = tool
            .call(
                &ctx(),
                json!({"tweets": [
                    {"text": "future", "scheduleTime": tomorrow()},
                    {"text": "past", "scheduleTime": "2001-01-01T00:00:00Z"}
                ]}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ScheduleInThePast { index: 1, .. }));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn schedule_returns_ids() {
        let api = Arc::new(InMemoryTwitter::default());
        let (scheduler, _rx) = TweetScheduler::new(api);
        let tool = ScheduleTweets::new(scheduler.clone());
        let out = tool
            .call(
                &ctx(),
                json!({"tweets": [{"text": "later", "scheduleTime": tomorrow()}]}),
            )
            .await
            .unwrap();
        let text = out.flatten_text();
        assert!(text.starts_with("Tweets scheduled successfully: "));
        assert!(text.contains("\"scheduleId\""));
        assert!(text.contains("\"status\": \"scheduled\""));
        assert_eq!(scheduler.pending_count(), 1);
        scheduler.shutdown();
    }
}
