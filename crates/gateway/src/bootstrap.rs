//! Server startup: build the shared state and spawn background loops.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use bc_domain::config::Config;
use bc_protocol::{methods, JsonRpcNotification, LogMessageParams};
use bc_sessions::{IdlePolicy, SessionStore};
use bc_tools::twitter::{HttpTwitterClient, InMemoryTwitter, OAuthCredentials, TwitterApi};
use bc_tools::{standard_registry, ScheduleOutcome, TweetScheduler};

use crate::state::AppState;

/// Which Twitter backend the tools talk to.
pub enum TwitterBackend {
    /// The v2 REST API; credentials come from the environment.
    Live,
    /// In-process fake; nothing leaves the machine.
    DryRun,
}

/// Build the shared [`AppState`].
///
/// Returns the receiving end of the scheduler's completion channel, which
/// [`spawn_background_tasks`] consumes. Missing Twitter credentials are
/// fatal for [`TwitterBackend::Live`].
pub fn build_app_state(
    config: Arc<Config>,
    backend: TwitterBackend,
) -> anyhow::Result<(AppState, mpsc::UnboundedReceiver<ScheduleOutcome>)> {
    let api: Arc<dyn TwitterApi> = match backend {
        TwitterBackend::Live => {
            let creds = OAuthCredentials::from_env(&config.twitter)
                .context("Twitter credentials are required to serve")?;
            Arc::new(
                HttpTwitterClient::new(&config.twitter, creds).context("building Twitter client")?,
            )
        }
        TwitterBackend::DryRun => {
            tracing::warn!("dry run: Twitter calls are served by an in-memory fake");
            Arc::new(InMemoryTwitter::default())
        }
    };
    build_app_state_with(config, api)
}

/// Build the state around an already constructed Twitter client.
pub fn build_app_state_with(
    config: Arc<Config>,
    api: Arc<dyn TwitterApi>,
) -> anyhow::Result<(AppState, mpsc::UnboundedReceiver<ScheduleOutcome>)> {
    let (scheduler, outcomes) = TweetScheduler::new(Arc::clone(&api));
    let tools = standard_registry(api, Arc::clone(&scheduler)).context("registering tools")?;
    tracing::info!(count = tools.len(), "tools registered");

    let state = AppState {
        config,
        sessions: Arc::new(SessionStore::new()),
        tools: Arc::new(tools),
        scheduler,
    };
    Ok((state, outcomes))
}

/// Spawn the long-running background tasks (idle session sweep, schedule
/// outcome forwarding).
pub fn spawn_background_tasks(
    state: &AppState,
    outcomes: mpsc::UnboundedReceiver<ScheduleOutcome>,
) {
    // ── Idle session sweep ──────────────────────────────────────────
    let policy = IdlePolicy::from_secs(state.config.server.session_idle_secs);
    if let Some(every) = policy.sweep_interval() {
        let sessions = state.sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let pruned = sessions.prune_idle(&policy);
                if pruned > 0 {
                    tracing::info!(pruned, remaining = sessions.len(), "idle sessions closed");
                }
            }
        });
    } else {
        tracing::info!("idle session expiry disabled");
    }

    // ── Scheduled tweet outcomes → owning session ───────────────────
    forward_schedule_outcomes(state.sessions.clone(), outcomes);

    tracing::info!("background tasks spawned");
}

/// Log every outcome and push it to the session that scheduled it as a
/// `notifications/message`. Outcomes for sessions that are gone are only
/// logged.
pub fn forward_schedule_outcomes(
    sessions: Arc<SessionStore>,
    mut outcomes: mpsc::UnboundedReceiver<ScheduleOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            let (level, data) = match &outcome.result {
                Ok(tweet) => {
                    tracing::info!(schedule_id = %outcome.schedule_id, "scheduled tweet posted");
                    (
                        "info",
                        serde_json::json!({
                            "scheduleId": outcome.schedule_id,
                            "status": "posted",
                            "text": outcome.text,
                            "tweet": tweet,
                        }),
                    )
                }
                Err(e) => {
                    tracing::warn!(schedule_id = %outcome.schedule_id, error = %e, "scheduled tweet failed");
                    (
                        "error",
                        serde_json::json!({
                            "scheduleId": outcome.schedule_id,
                            "status": "failed",
                            "text": outcome.text,
                            "error": e,
                        }),
                    )
                }
            };

            let Some(session) = outcome.session_id.as_deref().and_then(|id| sessions.get(id))
            else {
                continue;
            };
            let params = LogMessageParams {
                level: level.into(),
                logger: Some("scheduleTweets".into()),
                data,
            };
            let notification = match serde_json::to_value(params) {
                Ok(v) => JsonRpcNotification::new(methods::LOG_MESSAGE, Some(v)),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode schedule notification");
                    continue;
                }
            };
            if !session.notify(notification) {
                tracing::debug!(session_id = %session.id(), "schedule notification dropped");
            }
        }
    })
}
