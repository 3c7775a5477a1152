//! In-memory [`TwitterApi`] used by tests and local runs without
//! credentials.

use parking_lot::Mutex;
use serde_json::{json, Value};

use bc_domain::error::{Error, Result};

use super::client::TwitterApi;

#[derive(Default)]
pub struct InMemoryTwitter {
    tweets: Mutex<Vec<(String, String)>>,
    next_id: Mutex<u64>,
    fail_with: Option<String>,
}

impl InMemoryTwitter {
    /// Every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Texts of the tweets currently stored, oldest first.
    pub fn posted(&self) -> Vec<String> {
        self.tweets.lock().iter().map(|(_, t)| t.clone()).collect()
    }

    fn check(&self) -> Result<()> {
        match &self.fail_with {
            Some(msg) => Err(Error::Provider {
                provider: "twitter".into(),
                message: msg.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl TwitterApi for InMemoryTwitter {
    async fn create_tweet(&self, text: &str) -> Result<Value> {
        self.check()?;
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            next.to_string()
        };
        self.tweets.lock().push((id.clone(), text.to_string()));
        Ok(json!({ "id": id, "text": text }))
    }

    async fn me(&self) -> Result<Value> {
        self.check()?;
        Ok(json!({ "id": "0", "name": "Birdcall", "username": "birdcall" }))
    }

    async fn user_tweets(&self, max_results: u32) -> Result<Value> {
        self.check()?;
        let tweets = self.tweets.lock();
        let recent: Vec<Value> = tweets
            .iter()
            .rev()
            .take(max_results as usize)
            .map(|(id, text)| json!({ "id": id, "text": text }))
            .collect();
        Ok(Value::Array(recent))
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<Value> {
        self.check()?;
        let mut tweets = self.tweets.lock();
        let before = tweets.len();
        tweets.retain(|(id, _)| id != tweet_id);
        Ok(json!({ "deleted": tweets.len() < before }))
    }
}
