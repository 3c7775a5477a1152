//! Delayed tweet posting.
//!
//! Each scheduled tweet is a detached task that sleeps until its time,
//! posts, and reports a [`ScheduleOutcome`] on the completion channel.
//! The request that scheduled it has long returned by then.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use bc_domain::trace::TraceEvent;

use crate::twitter::TwitterApi;

/// What the scheduling request returns for each tweet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTweet {
    pub schedule_id: String,
    pub text: String,
    pub schedule_time: DateTime<Utc>,
    pub status: &'static str,
}

/// Result of one delayed post, delivered after it fires.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub schedule_id: String,
    /// Session that scheduled the tweet, if it came over MCP.
    pub session_id: Option<String>,
    pub text: String,
    /// The posted tweet's `data` on success, the error text otherwise.
    pub result: Result<serde_json::Value, String>,
}

pub struct TweetScheduler {
    api: Arc<dyn TwitterApi>,
    outcomes: mpsc::UnboundedSender<ScheduleOutcome>,
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl TweetScheduler {
    /// Returns the scheduler and the receiving end of its completion channel.
    pub fn new(api: Arc<dyn TwitterApi>) -> (Arc<Self>, mpsc::UnboundedReceiver<ScheduleOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Arc::new(Self {
            api,
            outcomes: tx,
            pending: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        });
        (scheduler, rx)
    }

    /// Spawn the delayed post. A time already passed fires immediately;
    /// callers reject past times before getting here.
    pub fn schedule(
        &self,
        session_id: Option<String>,
        text: String,
        at: DateTime<Utc>,
    ) -> ScheduledTweet {
        let schedule_id = uuid::Uuid::new_v4().to_string();
        let delay = (at - Utc::now()).to_std().unwrap_or_default();

        TraceEvent::TweetScheduled {
            schedule_id: schedule_id.clone(),
            delay_ms: delay.as_millis() as u64,
        }
        .emit();

        let api = Arc::clone(&self.api);
        let outcomes = self.outcomes.clone();
        let cancel = self.shutdown.child_token();
        let id = schedule_id.clone();
        let body = text.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(schedule_id = %id, "scheduled tweet cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let result = api.create_tweet(&body).await.map_err(|e| e.to_string());
            TraceEvent::ScheduleCompleted {
                schedule_id: id.clone(),
                success: result.is_ok(),
            }
            .emit();

            let _ = outcomes.send(ScheduleOutcome {
                schedule_id: id,
                session_id,
                text: body,
                result,
            });
        });

        let mut pending = self.pending.lock();
        pending.retain(|_, h| !h.is_finished());
        pending.insert(schedule_id.clone(), handle);

        ScheduledTweet {
            schedule_id,
            text,
            schedule_time: at,
            status: "scheduled",
        }
    }

    /// Tweets still waiting to fire.
    pub fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock();
        pending.retain(|_, h| !h.is_finished());
        pending.len()
    }

    /// Cancel everything still pending.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let drained: Vec<_> = self.pending.lock().drain().collect();
        tracing::info!(count = drained.len(), "scheduler stopped");
    }
}
