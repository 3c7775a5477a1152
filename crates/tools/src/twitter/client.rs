//! Twitter v2 REST client.

use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use bc_domain::config::TwitterConfig;
use bc_domain::error::{Error, Result};

use super::oauth::{authorization_header, OAuthCredentials};

/// The Twitter operations the tools need. Implemented over HTTP in
/// production and in memory in tests.
#[async_trait::async_trait]
pub trait TwitterApi: Send + Sync + 'static {
    /// Post a tweet; returns the API's `data` object (`id`, `text`).
    async fn create_tweet(&self, text: &str) -> Result<Value>;
    /// Profile of the authenticated user.
    async fn me(&self) -> Result<Value>;
    /// Recent tweets of the authenticated user.
    async fn user_tweets(&self, max_results: u32) -> Result<Value>;
    async fn delete_tweet(&self, tweet_id: &str) -> Result<Value>;
}

impl OAuthCredentials {
    /// Read the four credentials from the env vars named in `cfg`.
    /// The first missing one is reported by name.
    pub fn from_env(cfg: &TwitterConfig) -> Result<Self> {
        let read = |var: &str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{var} is not set")))
        };
        Ok(Self {
            consumer_key: read(&cfg.api_key_env)?,
            consumer_secret: read(&cfg.api_secret_env)?,
            access_token: read(&cfg.access_token_env)?,
            access_token_secret: read(&cfg.access_token_secret_env)?,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct HttpTwitterClient {
    base_url: String,
    creds: OAuthCredentials,
    client: reqwest::Client,
    user_id: OnceCell<String>,
}

impl HttpTwitterClient {
    pub fn new(cfg: &TwitterConfig, creds: OAuthCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            creds,
            client,
            user_id: OnceCell::new(),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let auth = authorization_header(&self.creds, method.as_str(), &url, query);

        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .query(query);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(e.to_string())
            } else {
                Error::Http(e.to_string())
            }
        })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(%method, path, status = status.as_u16(), "twitter API error");
            return Err(Error::Provider {
                provider: "twitter".into(),
                message: format!("HTTP {status}: {text}"),
            });
        }

        let value: Value = serde_json::from_str(&text)?;
        Ok(value.get("data").cloned().unwrap_or(value))
    }

    async fn user_id(&self) -> Result<&str> {
        let id = self
            .user_id
            .get_or_try_init(|| async {
                let me = self.me().await?;
                me.get("id")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| Error::Other("users/me response has no id".into()))
            })
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait::async_trait]
impl TwitterApi for HttpTwitterClient {
    async fn create_tweet(&self, text: &str) -> Result<Value> {
        self.send(Method::POST, "/tweets", &[], Some(json!({ "text": text })))
            .await
    }

    async fn me(&self) -> Result<Value> {
        self.send(
            Method::GET,
            "/users/me",
            &[("user.fields", "created_at,description,public_metrics")],
            None,
        )
        .await
    }

    async fn user_tweets(&self, max_results: u32) -> Result<Value> {
        let user_id = self.user_id().await?.to_owned();
        let max = max_results.to_string();
        self.send(
            Method::GET,
            &format!("/users/{user_id}/tweets"),
            &[("max_results", max.as_str())],
            None,
        )
        .await
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<Value> {
        let path = format!("/tweets/{}", urlencoding::encode(tweet_id));
        self.send(Method::DELETE, &path, &[], None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_is_named() {
        let cfg = TwitterConfig {
            api_key_env: "BC_TEST_TWITTER_KEY_404".into(),
            ..TwitterConfig::default()
        };
        let err = OAuthCredentials::from_env(&cfg).unwrap_err();
        assert_eq!(err.to_string(), "config: BC_TEST_TWITTER_KEY_404 is not set");
    }

    #[test]
    fn all_credentials_present() {
        let cfg = TwitterConfig {
            api_key_env: "BC_TEST_TW_A".into(),
            api_secret_env: "BC_TEST_TW_B".into(),
            access_token_env: "BC_TEST_TW_C".into(),
            access_token_secret_env: "BC_TEST_TW_D".into(),
            ..TwitterConfig::default()
        };
        for (var, val) in [("BC_TEST_TW_A", "a"), ("BC_TEST_TW_B", "b"), ("BC_TEST_TW_C", "c"), ("BC_TEST_TW_D", "d")] {
            std::env::set_var(var, val);
        }
        let creds = OAuthCredentials::from_env(&cfg).unwrap();
        assert_eq!(creds.consumer_key, "a");
        assert_eq!(creds.access_token_secret, "d");
        for var in ["BC_TEST_TW_A", "BC_TEST_TW_B", "BC_TEST_TW_C", "BC_TEST_TW_D"] {
            std::env::remove_var(var);
        }
    }
}
